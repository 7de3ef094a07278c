// Admin export: read-only CSV projection of the registrant list.
// Spreadsheet layout is out of scope; the columns mirror the admin listing.

use anyhow::{anyhow, Result};

use crate::registrant::Registrant;

pub fn registrants_to_csv(registrants: &[Registrant]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "Full Name",
        "Email",
        "Phone",
        "Pass Type",
        "Amount",
        "Payment Status",
    ])?;

    for r in registrants {
        writer.write_record([
            r.fullname.as_str(),
            r.email.as_str(),
            r.phone.as_str(),
            r.pass_type.as_str(),
            &r.amount.to_string(),
            r.payment_status.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("flushing csv writer: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}
