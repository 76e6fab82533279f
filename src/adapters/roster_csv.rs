use crate::domain::model::{Student, StudentId, TokenBalance};
use crate::utils::error::Result;
use std::io::{Read, Write};

pub const EXPORT_HEADERS: [&str; 9] = [
    "Name",
    "Roll Number",
    "Department",
    "Year",
    "Email",
    "Phone Number",
    "Breakfast Tokens",
    "Lunch Tokens",
    "Dinner Tokens",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    /// 1-based line in the source file.
    pub line: usize,
    pub student: Student,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub rows: Vec<RosterRow>,
    pub skipped_rows: Vec<usize>,
}

/// Reads the positional roster layout:
/// name, roll number, department, year, email, phone, breakfast, lunch, dinner.
///
/// A leading row whose first cell is "name" is treated as a header. Rows
/// missing a name, roll number or email are skipped; unparsable counts read as
/// zero and an unparsable year as 1. Each student gets a fresh id.
pub fn read_roster<R: Read>(reader: R) -> Result<ImportReport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut report = ImportReport::default();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let line = row
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        let cell = |i: usize| row.get(i).unwrap_or("");

        if index == 0 && cell(0).eq_ignore_ascii_case("name") {
            continue;
        }

        let (name, roll_number, email) = (cell(0), cell(1), cell(4));
        if name.is_empty() || roll_number.is_empty() || email.is_empty() {
            tracing::debug!("Skipping roster line {}: missing name, roll number or email", line);
            report.skipped_rows.push(line);
            continue;
        }

        let count = |i: usize| cell(i).parse::<u32>().unwrap_or(0);
        let student = Student {
            id: StudentId::generate(),
            name: name.to_string(),
            roll_number: roll_number.to_string(),
            department: cell(2).to_string(),
            year: cell(3).parse::<u32>().ok().filter(|y| *y > 0).unwrap_or(1),
            email: email.to_string(),
            phone_number: cell(5).to_string(),
            tokens: TokenBalance::new(count(6), count(7), count(8)),
            version: 0,
        };
        report.rows.push(RosterRow { line, student });
    }

    Ok(report)
}

pub fn write_roster<W: Write>(writer: W, students: &[Student]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_HEADERS)?;

    for student in students {
        csv_writer.write_record([
            student.name.clone(),
            student.roll_number.clone(),
            student.department.clone(),
            student.year.to_string(),
            student.email.clone(),
            student.phone_number.clone(),
            student.tokens.breakfast.to_string(),
            student.tokens.lunch.to_string(),
            student.tokens.dinner.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
