use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::MeritRow;

pub const CSV_HEADER: &str = "AppID,Name,Dept,GPA,Exam,Score";

/// Write the merit list: bare header, then every field quoted with doubled inner quotes.
pub fn write_csv<W: Write>(rows: &[MeritRow], mut out: W) -> Result<(), csv::Error> {
    out.write_all(CSV_HEADER.as_bytes())?;
    out.write_all(b"\n")?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    for row in rows {
        let gpa = row.gpa.to_string();
        let exam = row.exam.to_string();
        let score = row.score.to_string();
        writer.write_record([
            row.application_id.as_str(),
            row.name.as_str(),
            row.department.code(),
            gpa.as_str(),
            exam.as_str(),
            score.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
