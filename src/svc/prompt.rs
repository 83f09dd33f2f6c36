//! # Prompt module
//!
//! This module provides line based interactions with the user

use std::io::{self, BufRead, Write};

use tokio::{
    runtime::{Handle, RuntimeFlavor},
    task,
};

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read answer, reached end of input")]
    Eof,
    #[error("failed to read answer, {0}")]
    Read(io::Error),
    #[error("failed to write on output, {0}")]
    Write(io::Error),
}

// -----------------------------------------------------------------------------
// Prompt structure

#[derive(Debug)]
pub struct Prompt<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> Prompt<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// writes the question and returns the trimmed answer
    pub fn ask(&mut self, question: &str) -> Result<String, Error> {
        self.write(question)?;

        let mut line = String::new();
        if self.read_line(&mut line).map_err(Error::Read)? == 0 {
            return Err(Error::Eof);
        }

        Ok(line.trim().to_string())
    }

    /// returns true if the answer is `n` or `no`, whatever the case, any
    /// other answer counts as an agreement
    pub fn declines(&mut self, question: &str) -> Result<bool, Error> {
        let answer = self.ask(question)?.to_lowercase();

        Ok(answer == "n" || answer == "no")
    }

    pub fn say(&mut self, line: &str) -> Result<(), Error> {
        writeln!(self.writer, "{}", line).map_err(Error::Write)
    }

    /// writes without a trailing new line and flushes
    pub fn write(&mut self, s: &str) -> Result<(), Error> {
        self.writer.write_all(s.as_bytes()).map_err(Error::Write)?;
        self.writer.flush().map_err(Error::Write)
    }

    /// reads a line, on a multi-threaded runtime the worker hands its other
    /// tasks over while blocked on the reader
    fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => {
                task::block_in_place(|| self.reader.read_line(line))
            }
            _ => self.reader.read_line(line),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()), vec![])
    }

    #[test]
    fn answers_are_trimmed() {
        let mut prompt = prompt("  db01 \r\n2\n");

        assert_eq!(prompt.ask("name: ").unwrap(), "db01");
        assert_eq!(prompt.ask("count: ").unwrap(), "2");

        let (_, output) = prompt.into_inner();
        assert_eq!(String::from_utf8(output).unwrap(), "name: count: ");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn answers_are_read_on_a_multi_threaded_runtime() {
        let mut prompt = prompt("prod\n");

        assert_eq!(prompt.ask("name: ").unwrap(), "prod");
        assert!(matches!(prompt.ask("name: "), Err(Error::Eof)));
    }

    #[tokio::test]
    async fn answers_are_read_on_a_current_thread_runtime() {
        let mut prompt = prompt("prod\n");

        assert_eq!(prompt.ask("name: ").unwrap(), "prod");
    }

    #[test]
    fn end_of_input_is_an_error() {
        let mut prompt = prompt("");

        assert!(matches!(prompt.ask("name: "), Err(Error::Eof)));
    }

    #[test]
    fn only_no_declines() {
        let mut prompt = prompt("N\nno\ny\nmaybe\n\n");

        assert!(prompt.declines("? ").unwrap());
        assert!(prompt.declines("? ").unwrap());
        assert!(!prompt.declines("? ").unwrap());
        assert!(!prompt.declines("? ").unwrap());
        assert!(!prompt.declines("? ").unwrap());
    }
}
