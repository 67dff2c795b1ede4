use std::io::{self, Write};

use serde::Serialize;

use crate::app::{DeleteResult, ListResult, ScanReport, SearchResult};
use crate::domain::Submission;
use crate::store::StoreStatistics;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_scan(report: &ScanReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_submission(submission: &Submission) -> io::Result<()> {
        Self::print_json(submission)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_search(result: &SearchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_delete(result: &DeleteResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_stats(result: &StoreStatistics) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn render<T: Serialize>(value: &T) -> io::Result<String> {
        serde_json::to_string_pretty(value).map_err(io::Error::other)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = Self::render(value)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
