use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;
use crate::metadata::Envelope;

pub fn render(envelope: &Envelope<Value>, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, envelope, pretty)?;
    handle.flush()?;
    Ok(())
}

pub fn write_json<W, T>(writer: &mut W, value: &T, pretty: bool) -> Result<(), CliError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writeln!(writer)?;
    Ok(())
}
