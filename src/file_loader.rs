use crate::error::VmError;
use crate::state::State;
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, info};
use std::fs;
use std::io::BufReader;
use std::path::Path;

/// Reads every big-endian word out of an image file. The first word is the
/// origin the remainder loads at; readers that want the origin separately
/// should call `read_rom` and split the first element off themselves.
fn read_rom(path: &Path) -> Result<Vec<u16>, std::io::Error> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut buffer = Vec::new();

    loop {
        match reader.read_u16::<BigEndian>() {
            Ok(value) => buffer.push(value),
            Err(e) => {
                return if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Ok(buffer)
                } else {
                    Err(e)
                };
            }
        }
    }
}

/// Loads a single image file into `state`'s memory at the origin carried in
/// its first word. Words beyond `65536 - origin` are read but silently
/// dropped rather than written out of bounds.
pub fn load_file(path: &Path, state: &mut State) -> Result<(), VmError> {
    let words = read_rom(path).map_err(|source| VmError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let mut iter = words.into_iter();
    let origin = match iter.next() {
        Some(origin) => origin,
        None => {
            debug!("{}: empty image, nothing to load", path.display());
            return Ok(());
        }
    };

    let max_len = (u16::max_value() as usize + 1) - origin as usize;
    let mut address = origin;
    let mut loaded = 0usize;

    for word in iter.take(max_len) {
        state.write_memory(address, word);
        address = address.wrapping_add(1);
        loaded += 1;
    }

    info!(
        "loaded {} word(s) from {} at origin {:#06x}",
        loaded,
        path.display(),
        origin
    );

    Ok(())
}

/// Loads every image in order into the same memory. Later images overwrite
/// earlier ones where their ranges overlap.
pub fn load_files(paths: &[std::path::PathBuf], mut state: State) -> Result<State, VmError> {
    for path in paths {
        load_file(path, &mut state)?;
    }

    Ok(state)
}
