//! Resolve a directory name through the running server
//!
//! Output is consumed by a shell function:
//! - exact match: the best full path (every path with `--list`)
//! - partial match: every matching base name, one per line
//! - no match: nothing, exit status 1
//! - no server: error on stderr, exit status 2

use anyhow::Result;
use cli_lib::{ClientError, IpcClient};
use dirdex_core::Resolution;
use std::process::ExitCode;

const EXIT_NO_MATCH: u8 = 1;
const EXIT_NO_SERVER: u8 = 2;

pub async fn run(name: &str, list: bool, port: u16) -> Result<ExitCode> {
    let results = match fetch(name, port).await {
        Ok(results) => results,
        Err(e @ ClientError::NotRunning { .. }) => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(EXIT_NO_SERVER));
        }
        Err(e) => return Err(e.into()),
    };

    let lines = select_output(&results, list);
    if lines.is_empty() {
        return Ok(ExitCode::from(EXIT_NO_MATCH));
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

async fn fetch(name: &str, port: u16) -> Result<Vec<Resolution>, ClientError> {
    let mut client = IpcClient::connect(port).await?;
    client.get(name).await
}

/// Lines to print for a result set
fn select_output(results: &[Resolution], list: bool) -> Vec<String> {
    match results.first() {
        None => Vec::new(),
        Some(Resolution::Exact(path)) if !list => vec![path.to_string_lossy().into_owned()],
        Some(_) => results.iter().map(Resolution::value).collect(),
    }
}
