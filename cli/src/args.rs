//! Command-line arguments.

use clap::Parser;
use refrates_fx::ConversionRequest;
use rust_decimal::Decimal;

/// RefRates CLI
#[derive(Parser, Debug)]
#[command(name = "refrates")]
#[command(about = "Convert currencies with central-bank reference rates")]
pub struct Args {
    /// Source currency code
    pub from: String,

    /// Target currency code (omit to list every rate against the source)
    pub to: Option<String>,

    /// Amount to convert
    #[arg(short, long)]
    pub amount: Option<Decimal>,

    /// Read the 90-day historical series
    #[arg(long)]
    pub historical: bool,
}

impl Args {
    /// Build the conversion request.
    pub fn request(&self) -> ConversionRequest {
        let mut request = ConversionRequest::new(self.from.clone());
        if let Some(to) = &self.to {
            request = request.to(to.clone());
        }
        if let Some(amount) = self.amount {
            request = request.amount(amount);
        }
        if self.historical {
            request = request.historical();
        }
        request
    }
}
