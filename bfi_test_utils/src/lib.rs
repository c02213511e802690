use std::io::{self, Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

pub const TEST_FILE_CONTENT: &str = "+[-[<<[+[--->]-[<<<]]]>>>-]";
/// Operators in [`TEST_FILE_CONTENT`]. The trailing newline written to the file is a comment.
pub const TEST_FILE_NUM_INSTRUCTIONS: usize = TEST_FILE_CONTENT.len();

/// A temporary file holding a program with deeply nested loops, readable from the start.
pub struct TestFile {
    file: NamedTempFile,
}

impl TestFile {
    pub fn new() -> io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", TEST_FILE_CONTENT)?;

        file.seek(SeekFrom::Start(0))?;
        Ok(TestFile { file })
    }
}

impl Read for TestFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.as_file_mut().read(buf)
    }
}

/// Swallows everything written to it.
pub struct NullWriter;

impl Write for NullWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writer whose every write fails, for exercising output errors.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
