//! Client command line.
//!
//! ```text
//! facewire-client port [--detectfilename f] [--outputfilename f] [--replacefile f]
//! ```

use std::path::{Path, PathBuf};

use facewire_protocol::Operation;

use crate::error::ClientError;

const DETECT_FILE_ARG: &str = "--detectfilename";
const OUTPUT_FILE_ARG: &str = "--outputfilename";
const REPLACE_FILE_ARG: &str = "--replacefile";

/// Parsed client arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientArgs {
    pub port: String,
    /// Image to process; standard input when absent.
    pub detect_file: Option<PathBuf>,
    /// Destination for the result; standard output when absent.
    pub output_file: Option<PathBuf>,
    /// Replacement face. Its presence selects [`Operation::Replace`].
    pub replace_file: Option<PathBuf>,
}

impl ClientArgs {
    /// Parses the arguments after the program name.
    pub fn parse<I>(args: I) -> Result<Self, ClientError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut iter = args.into_iter().map(Into::into);

        let port = iter.next().ok_or(ClientError::Usage)?;
        if port.is_empty() {
            return Err(ClientError::Usage);
        }

        let mut parsed = Self {
            port,
            ..Self::default()
        };

        while let Some(flag) = iter.next() {
            let slot = match flag.as_str() {
                DETECT_FILE_ARG => &mut parsed.detect_file,
                OUTPUT_FILE_ARG => &mut parsed.output_file,
                REPLACE_FILE_ARG => &mut parsed.replace_file,
                _ => return Err(ClientError::Usage),
            };
            if slot.is_some() {
                return Err(ClientError::Usage);
            }
            match iter.next() {
                Some(value) if !value.is_empty() => *slot = Some(PathBuf::from(value)),
                _ => return Err(ClientError::Usage),
            }
        }

        Ok(parsed)
    }

    /// The request operation implied by the arguments.
    pub fn operation(&self) -> Operation {
        if self.replace_file.is_some() {
            Operation::Replace
        } else {
            Operation::Detect
        }
    }

    /// Checks that the input files can be read and the output file written.
    ///
    /// The output file is created (or truncated) as part of the check.
    pub fn check_files(&self) -> Result<(), ClientError> {
        for path in [&self.detect_file, &self.replace_file].into_iter().flatten() {
            check_readable(path)?;
        }
        if let Some(path) = &self.output_file {
            std::fs::File::create(path).map_err(|_| ClientError::OutputFile {
                path: path.clone(),
            })?;
        }
        Ok(())
    }
}

fn check_readable(path: &Path) -> Result<(), ClientError> {
    std::fs::File::open(path)
        .map(drop)
        .map_err(|_| ClientError::InputFile {
            path: path.to_path_buf(),
        })
}
