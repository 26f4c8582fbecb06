//! Canned feed payloads shared by the unit tests.

pub(crate) const DAILY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
	<gesmes:subject>Reference rates</gesmes:subject>
	<gesmes:Sender>
		<gesmes:name>European Central Bank</gesmes:name>
	</gesmes:Sender>
	<Cube>
		<Cube time='2024-01-05'>
			<Cube currency='USD' rate='1.0921'/>
			<Cube currency='JPY' rate='157.89'/>
			<Cube currency='GBP' rate='0.86053'/>
			<Cube currency='CHF' rate='0.9283'/>
		</Cube>
	</Cube>
</gesmes:Envelope>"#;

pub(crate) const HISTORICAL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
	<gesmes:subject>Reference rates</gesmes:subject>
	<Cube>
		<Cube time="2024-01-03">
			<Cube currency="USD" rate="1.0919"/>
			<Cube currency="GBP" rate="0.86388"/>
		</Cube>
		<Cube time="2024-01-05">
			<Cube currency="USD" rate="1.0921"/>
			<Cube currency="GBP" rate="0.86053"/>
		</Cube>
		<Cube time="2024-01-04">
			<Cube currency="USD" rate="1.0953"/>
		</Cube>
	</Cube>
</gesmes:Envelope>"#;
