use anyhow::Result;
use bytes::Bytes;
use lume_core::{Frame, KeyFormat};

use crate::helpers::{describe_frame, parse_hex};

pub fn run_inspect(frame_hex: &str, prefixed: bool) -> Result<()> {
    let bytes = parse_hex(frame_hex, "frame")?;
    let frame = Frame::decode(Bytes::from(bytes))?;
    let format = if prefixed {
        KeyFormat::Prefixed
    } else {
        KeyFormat::Raw
    };
    println!("{}", describe_frame(&frame, format));
    Ok(())
}
