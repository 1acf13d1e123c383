use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use common::{Command, DecodedReplay, Player, ReplayHeader};
use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;

use crate::error::DecodeError;

/// Turns a replay file into its header, players and ordered commands.
///
/// Decoding is blocking work; the pipeline calls it from the blocking pool.
pub trait ReplayDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedReplay, DecodeError>;
}

/// Reads the gzip-compressed newline-delimited JSON container written by
/// [`crate::recorder::ReplayRecorder`]: header on line 1, the player list on
/// line 2, then one command per line in frame order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipJsonDecoder;

impl ReplayDecoder for GzipJsonDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedReplay, DecodeError> {
        let io_err = |source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        let reader = BufReader::new(MultiGzDecoder::new(file));
        let mut lines = reader.lines().enumerate();

        let mut next_section = |section: &'static str| -> Result<(usize, String), DecodeError> {
            match lines.next() {
                Some((i, line)) => Ok((i + 1, line.map_err(io_err)?)),
                None => Err(DecodeError::MissingSection {
                    path: path.to_path_buf(),
                    section,
                }),
            }
        };

        let (line_no, line) = next_section("header")?;
        let header: ReplayHeader = parse_line(path, line_no, "header", &line)?;

        let (line_no, line) = next_section("players")?;
        let players: Vec<Player> = parse_line(path, line_no, "players", &line)?;

        let mut commands = Vec::new();
        for (i, line) in lines {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            let command: Command = parse_line(path, i + 1, "command", &line)?;
            commands.push(command);
        }

        Ok(DecodedReplay {
            header,
            players,
            commands,
        })
    }
}

fn parse_line<T: DeserializeOwned>(
    path: &Path,
    line: usize,
    section: &'static str,
    text: &str,
) -> Result<T, DecodeError> {
    serde_json::from_str(text).map_err(|source| DecodeError::Json {
        path: path.to_path_buf(),
        line,
        section,
        source,
    })
}
