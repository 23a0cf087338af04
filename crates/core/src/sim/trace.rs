//! Packed trace record decoding and encoding.
//!
//! Traces are streams of fixed-width, little-endian, unpadded records. Two
//! layouts exist:
//! 1. **Standard:** 2 destination slots, 64 bytes per record.
//! 2. **Cloudsuite:** 4 destination slots plus a 2-byte ASID, 84 bytes per record.
//!
//! A register value of 0 in a record means "no register" and is filtered out
//! during decoding; the same applies to memory operand slots. This absent
//! sentinel is a property of the record format only; the rename unit has its
//! own notion of an unmapped register.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

/// Source register slots per record.
pub const NUM_INSTR_SOURCES: usize = 4;

/// Destination register slots per standard record.
pub const NUM_INSTR_DESTINATIONS: usize = 2;

/// Destination register slots per cloudsuite record.
pub const NUM_INSTR_DESTINATIONS_SPARC: usize = 4;

/// On-disk trace record layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TraceFormat {
    /// 2 destination slots, no ASID.
    #[default]
    Standard,
    /// 4 destination slots and a 2-byte ASID.
    Cloudsuite,
}

impl TraceFormat {
    /// Destination register slots in this layout.
    pub fn destination_slots(self) -> usize {
        match self {
            TraceFormat::Standard => NUM_INSTR_DESTINATIONS,
            TraceFormat::Cloudsuite => NUM_INSTR_DESTINATIONS_SPARC,
        }
    }

    /// Packed record size in bytes.
    ///
    /// ip (8) + is_branch (1) + branch_taken (1) + D dest regs + 4 src regs
    /// + D×8 dest mem + 4×8 src mem, plus 2 ASID bytes for cloudsuite.
    pub fn record_size(self) -> usize {
        let d = self.destination_slots();
        let base = 8 + 1 + 1 + d + NUM_INSTR_SOURCES + d * 8 + NUM_INSTR_SOURCES * 8;
        match self {
            TraceFormat::Standard => base,
            TraceFormat::Cloudsuite => base + 2,
        }
    }
}

/// One decoded trace record.
///
/// Register and memory operand slots whose record value was 0 ("absent") are
/// dropped, so the vectors hold only live operands, in slot order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceInstruction {
    /// Program counter.
    pub ip: u64,
    /// Is this a branch?
    pub is_branch: bool,
    /// Was the branch taken?
    pub branch_taken: bool,
    /// Architectural destination registers.
    pub destination_registers: Vec<u8>,
    /// Architectural source registers.
    pub source_registers: Vec<u8>,
    /// Effective addresses written.
    pub destination_memory: Vec<u64>,
    /// Effective addresses read.
    pub source_memory: Vec<u64>,
    /// Address space id (cloudsuite records only).
    pub asid: Option<[u8; 2]>,
}

impl TraceInstruction {
    /// Decodes one packed record.
    ///
    /// `buf` must be exactly `format.record_size()` bytes.
    pub fn decode(buf: &[u8], format: TraceFormat) -> Self {
        assert_eq!(buf.len(), format.record_size(), "record size mismatch");
        let d = format.destination_slots();

        let ip = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let is_branch = buf[8] != 0;
        let branch_taken = buf[9] != 0;

        let mut offset = 10;
        let destination_registers: Vec<u8> = buf[offset..offset + d]
            .iter()
            .copied()
            .filter(|&r| r != 0)
            .collect();
        offset += d;
        let source_registers: Vec<u8> = buf[offset..offset + NUM_INSTR_SOURCES]
            .iter()
            .copied()
            .filter(|&r| r != 0)
            .collect();
        offset += NUM_INSTR_SOURCES;

        let mut read_addrs = |count: usize, offset: &mut usize| -> Vec<u64> {
            let mut addrs = Vec::new();
            for _ in 0..count {
                let addr = u64::from_le_bytes(buf[*offset..*offset + 8].try_into().unwrap());
                *offset += 8;
                if addr != 0 {
                    addrs.push(addr);
                }
            }
            addrs
        };
        let destination_memory = read_addrs(d, &mut offset);
        let source_memory = read_addrs(NUM_INSTR_SOURCES, &mut offset);

        let asid = match format {
            TraceFormat::Standard => None,
            TraceFormat::Cloudsuite => Some([buf[offset], buf[offset + 1]]),
        };

        Self {
            ip,
            is_branch,
            branch_taken,
            destination_registers,
            source_registers,
            destination_memory,
            source_memory,
            asid,
        }
    }

    /// Encodes the record into `format`'s packed layout.
    ///
    /// Operands are laid into the leading slots; unused slots are zeroed.
    /// The operand lists must fit the layout's slot counts.
    pub fn encode(&self, format: TraceFormat) -> Vec<u8> {
        let d = format.destination_slots();
        assert!(
            self.destination_registers.len() <= d
                && self.source_registers.len() <= NUM_INSTR_SOURCES
                && self.destination_memory.len() <= d
                && self.source_memory.len() <= NUM_INSTR_SOURCES,
            "operand count exceeds {:?} slot capacity",
            format
        );

        let mut buf = vec![0u8; format.record_size()];
        buf[0..8].copy_from_slice(&self.ip.to_le_bytes());
        buf[8] = self.is_branch as u8;
        buf[9] = self.branch_taken as u8;

        let mut offset = 10;
        buf[offset..offset + self.destination_registers.len()]
            .copy_from_slice(&self.destination_registers);
        offset += d;
        buf[offset..offset + self.source_registers.len()].copy_from_slice(&self.source_registers);
        offset += NUM_INSTR_SOURCES;

        for &addr in &self.destination_memory {
            buf[offset..offset + 8].copy_from_slice(&addr.to_le_bytes());
            offset += 8;
        }
        offset = 10 + d + NUM_INSTR_SOURCES + d * 8;
        for &addr in &self.source_memory {
            buf[offset..offset + 8].copy_from_slice(&addr.to_le_bytes());
            offset += 8;
        }
        offset = 10 + d + NUM_INSTR_SOURCES + (d + NUM_INSTR_SOURCES) * 8;

        if let (TraceFormat::Cloudsuite, Some(asid)) = (format, self.asid) {
            buf[offset] = asid[0];
            buf[offset + 1] = asid[1];
        }
        buf
    }
}

/// Buffered reader of packed trace records.
pub struct TraceReader<R: Read> {
    inner: R,
    format: TraceFormat,
    buf: Vec<u8>,
    records_read: u64,
}

impl TraceReader<BufReader<File>> {
    /// Opens a trace file for reading.
    pub fn open(path: impl AsRef<Path>, format: TraceFormat) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?), format))
    }
}

impl<R: Read> TraceReader<R> {
    /// Wraps an arbitrary byte stream (file, stdin, decompressor pipe).
    pub fn new(inner: R, format: TraceFormat) -> Self {
        let size = format.record_size();
        Self {
            inner,
            format,
            buf: vec![0u8; size],
            records_read: 0,
        }
    }

    /// The layout this reader decodes.
    pub fn format(&self) -> TraceFormat {
        self.format
    }

    /// Records decoded so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` at a clean end of stream. A partial trailing
    /// record means the trace is truncated and is an `UnexpectedEof` error.
    pub fn next_record(&mut self) -> io::Result<Option<TraceInstruction>> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < self.buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "truncated record after {} complete records ({} of {} bytes)",
                    self.records_read,
                    filled,
                    self.buf.len()
                ),
            ));
        }
        self.records_read += 1;
        Ok(Some(TraceInstruction::decode(&self.buf, self.format)))
    }
}

/// Writer of packed trace records.
pub struct TraceWriter<W: Write> {
    inner: W,
    format: TraceFormat,
    records_written: u64,
}

impl<W: Write> TraceWriter<W> {
    /// Wraps a byte sink.
    pub fn new(inner: W, format: TraceFormat) -> Self {
        Self {
            inner,
            format,
            records_written: 0,
        }
    }

    /// Appends one record.
    pub fn write_record(&mut self, instr: &TraceInstruction) -> io::Result<()> {
        self.inner.write_all(&instr.encode(self.format))?;
        self.records_written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
