use std::{
    fs,
    io::{self, BufRead, BufReader},
    mem,
    num::ParseIntError,
    path::PathBuf,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use thiserror::Error;
use xz2::read::XzDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Instruction,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAccess {
    pub address: u32,
    pub kind: AccessKind,
}

impl MemAccess {
    pub fn instr(address: u32) -> Self {
        MemAccess {
            address,
            kind: AccessKind::Instruction,
        }
    }

    pub fn data(address: u32) -> Self {
        MemAccess {
            address,
            kind: AccessKind::Data,
        }
    }
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: unknown access type `{kind}`")]
    UnknownKind { line: usize, kind: String },
    #[error("line {line}: invalid address `{address}`")]
    BadAddress {
        line: usize,
        address: String,
        #[source]
        source: ParseIntError,
    },
    #[error("line {line}: expected `<I|D> <hex address>`")]
    Malformed { line: usize },
}

/// Parses one `I 0x1f40` / `D 7fff0010` record. Blank lines yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<MemAccess>, TraceError> {
    let mut fields = line.split_whitespace();
    let Some(kind) = fields.next() else {
        return Ok(None);
    };
    let (Some(address), None) = (fields.next(), fields.next()) else {
        return Err(TraceError::Malformed { line: line_no });
    };

    let kind = match kind {
        "I" => AccessKind::Instruction,
        "D" => AccessKind::Data,
        _ => {
            return Err(TraceError::UnknownKind {
                line: line_no,
                kind: kind.to_owned(),
            })
        }
    };

    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    let address = u32::from_str_radix(digits, 16).map_err(|source| TraceError::BadAddress {
        line: line_no,
        address: address.to_owned(),
        source,
    })?;

    Ok(Some(MemAccess { address, kind }))
}

pub type Batch = Result<Vec<MemAccess>, TraceError>;

/// Trace parsed on a background thread and handed over in batches.
/// The channel closes after the last batch or right after the first error.
pub struct Trace {
    pub rec: Receiver<Batch>,
    _thread: JoinHandle<()>,
}

impl Trace {
    /// Opens a trace file, decompressing it on the fly when it ends in `.xz`.
    pub fn read(
        path: PathBuf,
        accesses_per_batch: usize,
        batches_per_queue: usize,
    ) -> io::Result<Trace> {
        let stream = fs::File::open(&path)?;
        let compressed = path.extension().is_some_and(|ext| ext == "xz");
        log::debug!("reading trace {} (xz: {compressed})", path.display());

        let trace = if compressed {
            Trace::from_reader(
                BufReader::new(XzDecoder::new(stream)),
                accesses_per_batch,
                batches_per_queue,
            )
        } else {
            Trace::from_reader(BufReader::new(stream), accesses_per_batch, batches_per_queue)
        };
        Ok(trace)
    }

    pub fn from_reader<R: BufRead + Send + 'static>(
        reader: R,
        accesses_per_batch: usize,
        batches_per_queue: usize,
    ) -> Trace {
        let (sender, receiver) = crossbeam::channel::bounded(batches_per_queue);
        let per_batch = accesses_per_batch.max(1);

        let t = thread::spawn(move || Trace::run_thread(reader, per_batch, sender));

        Trace {
            rec: receiver,
            _thread: t,
        }
    }

    fn run_thread<R: BufRead>(reader: R, per_batch: usize, queue: Sender<Batch>) {
        let mut buffer = Vec::with_capacity(per_batch);
        for (idx, line) in reader.lines().enumerate() {
            let parsed = line
                .map_err(TraceError::from)
                .and_then(|line| parse_line(idx + 1, &line));
            match parsed {
                Ok(Some(access)) => buffer.push(access),
                Ok(None) => continue,
                Err(err) => {
                    let _ = queue.send(Err(err));
                    return;
                }
            }

            if buffer.len() == per_batch {
                let full = mem::replace(&mut buffer, Vec::with_capacity(per_batch));
                if queue.send(Ok(full)).is_err() {
                    return;
                }
            }
        }

        if !buffer.is_empty() {
            let _ = queue.send(Ok(buffer));
        }
    }
}
