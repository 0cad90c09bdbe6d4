//! CSV export of reservations for administrators.

use csv::Writer;

use crate::repositories::reservation::ReservationDetail;

pub const CSV_HEADER: [&str; 5] = ["Email", "Axis", "Year", "ISO Week", "Created"];

/// Renders one row per reservation, in the order given, after a header row.
pub fn reservations_csv(reservations: &[ReservationDetail]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for reservation in reservations {
        let year = reservation.year.to_string();
        let week = reservation.week.to_string();
        let created = reservation.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
        writer.write_record([
            reservation.user_email.as_str(),
            reservation.axis_name.as_str(),
            year.as_str(),
            week.as_str(),
            created.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
