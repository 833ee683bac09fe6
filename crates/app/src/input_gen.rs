//! Sample data for trying the codec.
//!
//! Generated data is a sequence of segments, each one of:
//! - runs of a single byte (highly compressible)
//! - text drawn from a small alphabet (moderately compressible)
//! - a short pattern repeated (structured)
//! - uniform random bytes (incompressible)
//!
//! so the compression ratio reported for a sample depends on the mix.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use huffpack_core::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest segment of a single kind.
const SEGMENT_BYTES: usize = 8192;

const TEXT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz .!,\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Run,
    Text,
    Pattern,
    Random,
}

impl Segment {
    /// 30% runs, 30% text, 20% patterns, 20% random.
    fn pick(rng: &mut ChaCha8Rng) -> Self {
        match rng.gen_range(0..10) {
            0..=2 => Segment::Run,
            3..=5 => Segment::Text,
            6..=7 => Segment::Pattern,
            _ => Segment::Random,
        }
    }
}

/// Generate `size_bytes` of sample data. The same seed always yields the
/// same bytes.
pub fn generate_sample_data(seed: u64, size_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size_bytes);

    while data.len() < size_bytes {
        let len = (size_bytes - data.len()).min(SEGMENT_BYTES);

        match Segment::pick(&mut rng) {
            Segment::Run => {
                let byte: u8 = rng.gen();
                data.extend(std::iter::repeat(byte).take(len));
            }
            Segment::Text => {
                data.extend((0..len).map(|_| TEXT_ALPHABET[rng.gen_range(0..TEXT_ALPHABET.len())]));
            }
            Segment::Pattern => {
                let pattern: Vec<u8> = (0..rng.gen_range(4..=32)).map(|_| rng.gen()).collect();
                data.extend(pattern.iter().cycle().take(len));
            }
            Segment::Random => {
                data.extend((0..len).map(|_| rng.gen::<u8>()));
            }
        }
    }

    data
}

/// Write generated data to `path`.
pub fn write_sample_file(path: &Path, seed: u64, size_bytes: usize) -> Result<()> {
    let data = generate_sample_data(seed, size_bytes);
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&data)?;
    file.flush()?;
    Ok(())
}
