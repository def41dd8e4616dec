//! The binary term stream. The body holds a symbol table followed by the
//! nodes in bottom-up order, each node being a symbol index and the indices
//! of its argument nodes, written with the minimal number of bits. In
//! indexed mode every shared node is written once; in plain mode the term
//! tree is expanded.

use std::io::{Cursor, Read, Write};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use log::debug;
use rustc_hash::FxHashMap;
use thiserror::Error;

use mcrl2rust_aterm::{ATerm, Symbol, TermPool, INT_SYMBOL};

use crate::packed::{read_packed, read_string, write_packed, write_string};

/// The version of the persisted format.
const FORMAT_VERSION: u64 = 1;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("invalid term stream: {0}")]
    InvalidTerm(String),
}

/// The document type recorded in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileType {
    Generic,
    Mcrl2,
    Mcrl2Info,
    Other(String),
}

impl FileType {
    fn descriptor(&self) -> &str {
        match self {
            FileType::Generic => "generic",
            FileType::Mcrl2 => "mCRL2",
            FileType::Mcrl2Info => "mCRL2+info",
            FileType::Other(text) => text,
        }
    }

    fn from_descriptor(text: &str) -> FileType {
        match text {
            "generic" => FileType::Generic,
            "mCRL2" => FileType::Mcrl2,
            "mCRL2+info" => FileType::Mcrl2Info,
            other => FileType::Other(other.to_string()),
        }
    }
}

/// The header of a persisted term file.
#[derive(Clone, Debug)]
pub struct Header {
    pub indexed: bool,
    pub body_position: u64,
    pub trailer_position: u64,
    pub version: u64,
    pub creator: String,
    pub file_type: FileType,
}

/// The number of bits needed to distinguish `count` values.
fn width(count: usize) -> u32 {
    let mut bits = 1;
    while (1usize << bits) < count {
        bits += 1;
    }
    bits
}

/// Writes the term to the stream. In indexed mode shared subterms are
/// written once and referenced by index.
pub fn write_term(
    writer: &mut impl Write,
    term: &ATerm,
    indexed: bool,
    creator: &str,
    file_type: &FileType,
) -> Result<(), IoError> {
    // Serialise the body first so the header can record its position.
    let body = write_body(term, indexed)?;

    // The positions are relative to the start of the file: the body starts
    // after the header, and the trailer after the body. Growing positions
    // can widen their own encoding, so iterate until the layout is stable.
    let mut body_position = 0u64;
    let header = loop {
        let mut header = Vec::new();
        header.push(indexed as u8);
        write_packed(&mut header, false, body_position)?;
        write_packed(&mut header, false, body_position + body.len() as u64)?;
        write_packed(&mut header, false, FORMAT_VERSION)?;
        write_string(&mut header, creator)?;
        write_string(&mut header, file_type.descriptor())?;
        write_string(&mut header, "")?;
        write_string(&mut header, "")?;
        write_string(&mut header, "")?;

        if header.len() as u64 == body_position {
            break header;
        }
        body_position = header.len() as u64;
    };

    writer.write_all(&header)?;
    writer.write_all(&body)?;

    debug!(
        "wrote term stream: {} header bytes, {} body bytes",
        header.len(),
        body.len()
    );
    Ok(())
}

fn write_body(term: &ATerm, indexed: bool) -> Result<Vec<u8>, IoError> {
    // Collect the nodes bottom-up; in indexed mode each shared node once.
    let mut nodes: Vec<ATerm> = Vec::new();
    let mut children: Vec<Vec<usize>> = Vec::new();
    let mut node_index: FxHashMap<ATerm, usize> = FxHashMap::default();

    collect_nodes(term, indexed, &mut nodes, &mut children, &mut node_index);

    // The symbol table in order of first use.
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut symbol_index: FxHashMap<Symbol, usize> = FxHashMap::default();
    for node in &nodes {
        let symbol = node.head_symbol();
        if !symbol_index.contains_key(symbol) {
            symbol_index.insert(symbol.clone(), symbols.len());
            symbols.push(symbol.clone());
        }
    }

    let mut body = Vec::new();
    write_packed(&mut body, false, symbols.len() as u64)?;
    for symbol in &symbols {
        write_string(&mut body, symbol.name())?;
        write_packed(&mut body, symbol.is_quoted(), symbol.arity() as u64)?;
    }
    write_packed(&mut body, false, nodes.len() as u64)?;

    let symbol_bits = width(symbols.len());
    let node_bits = width(nodes.len());

    let mut bits = BitWriter::endian(&mut body, BigEndian);
    for (node, child_indices) in nodes.iter().zip(&children) {
        let index = symbol_index[node.head_symbol()];
        bits.write(symbol_bits, index as u64)?;

        if let Some(value) = node.int_value() {
            bits.write(64, value as u64)?;
        }

        for child in child_indices {
            bits.write(node_bits, *child as u64)?;
        }
    }
    bits.byte_align()?;

    Ok(body)
}

fn collect_nodes(
    term: &ATerm,
    indexed: bool,
    nodes: &mut Vec<ATerm>,
    children: &mut Vec<Vec<usize>>,
    node_index: &mut FxHashMap<ATerm, usize>,
) -> usize {
    if indexed {
        if let Some(&index) = node_index.get(term) {
            return index;
        }
    }

    let child_indices: Vec<usize> = term
        .arguments()
        .iter()
        .map(|argument| collect_nodes(argument, indexed, nodes, children, node_index))
        .collect();

    let index = nodes.len();
    nodes.push(term.clone());
    children.push(child_indices);
    if indexed {
        node_index.insert(term.clone(), index);
    }
    index
}

/// Reads a term written by [write_term], returning it with the header.
pub fn read_term(reader: &mut impl Read, tp: &mut TermPool) -> Result<(ATerm, Header), IoError> {
    let mut flag = [0u8; 1];
    reader.read_exact(&mut flag)?;
    let indexed = match flag[0] {
        0 => false,
        1 => true,
        _ => return Err(IoError::InvalidHeader("invalid indexed flag")),
    };

    let (_, body_position) = read_packed(reader)?;
    let (_, trailer_position) = read_packed(reader)?;
    let (_, version) = read_packed(reader)?;
    if version != FORMAT_VERSION {
        return Err(IoError::InvalidHeader("unsupported format version"));
    }

    let creator = read_string(reader)?;
    let file_type = FileType::from_descriptor(&read_string(reader)?);
    for _ in 0..3 {
        read_string(reader)?;
    }

    let header = Header {
        indexed,
        body_position,
        trailer_position,
        version,
        creator,
        file_type,
    };

    // The symbol table.
    let (_, symbol_count) = read_packed(reader)?;
    let mut symbols = Vec::with_capacity(symbol_count as usize);
    for _ in 0..symbol_count {
        let name = read_string(reader)?;
        let (quoted, arity) = read_packed(reader)?;
        let symbol = if quoted {
            tp.create_symbol_quoted(&name, arity as usize)
        } else {
            tp.create_symbol(&name, arity as usize)
        };
        symbols.push(symbol);
    }

    let (_, node_count) = read_packed(reader)?;
    if node_count == 0 {
        return Err(IoError::InvalidTerm("empty term stream".to_string()));
    }

    let symbol_bits = width(symbols.len());
    let node_bits = width(node_count as usize);

    let mut bits = BitReader::endian(reader, BigEndian);
    let mut nodes: Vec<ATerm> = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let index: u64 = bits.read(symbol_bits)?;
        let symbol = symbols
            .get(index as usize)
            .ok_or_else(|| IoError::InvalidTerm(format!("invalid symbol index {index}")))?
            .clone();

        if symbol.name() == INT_SYMBOL && symbol.arity() == 0 {
            let value: u64 = bits.read(64)?;
            nodes.push(tp.create_int(value as i64));
            continue;
        }

        let mut arguments = Vec::with_capacity(symbol.arity());
        for _ in 0..symbol.arity() {
            let argument: u64 = bits.read(node_bits)?;
            let argument = nodes
                .get(argument as usize)
                .ok_or_else(|| IoError::InvalidTerm(format!("invalid node index {argument}")))?;
            arguments.push(argument.clone());
        }

        nodes.push(tp.create(&symbol, &arguments));
    }

    let root = nodes.last().expect("the stream has at least one node").clone();
    Ok((root, header))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use mcrl2rust_aterm::random_term;

    #[test]
    fn test_term_stream_roundtrip() {
        let mut tp = TermPool::new();
        let term = tp.from_string("f(g(a,[1,2,3]),g(a,[1,2,3]))").unwrap();

        for indexed in [false, true] {
            let mut buffer = Vec::new();
            write_term(&mut buffer, &term, indexed, "mcrl22lpe", &FileType::Mcrl2).unwrap();

            let mut tp2 = TermPool::new();
            let (read, header) = read_term(&mut Cursor::new(&buffer), &mut tp2).unwrap();

            assert_eq!(format!("{}", read), format!("{}", term));
            assert_eq!(header.indexed, indexed);
            assert_eq!(header.creator, "mcrl22lpe");
            assert_eq!(header.file_type, FileType::Mcrl2);
            assert_eq!(header.version, FORMAT_VERSION);
        }
    }

    #[test]
    fn test_indexed_is_smaller_on_shared_terms() {
        let mut tp = TermPool::new();
        let term = tp
            .from_string("h(f(g(a),g(a)),f(g(a),g(a)),f(g(a),g(a)))")
            .unwrap();

        let mut indexed = Vec::new();
        write_term(&mut indexed, &term, true, "test", &FileType::Generic).unwrap();
        let mut plain = Vec::new();
        write_term(&mut plain, &term, false, "test", &FileType::Generic).unwrap();

        assert!(
            indexed.len() < plain.len(),
            "sharing must pay off on a repetitive term"
        );
    }

    #[test]
    fn test_random_roundtrip() {
        let mut tp = TermPool::new();
        let mut rng = rand::rng();

        for _ in 0..10 {
            let term = random_term(
                &mut tp,
                &mut rng,
                &[("f".to_string(), 2), ("g".to_string(), 1)],
                &["a".to_string(), "b".to_string()],
                6,
            );

            let mut buffer = Vec::new();
            write_term(&mut buffer, &term, true, "test", &FileType::Generic).unwrap();
            let (read, _) = read_term(&mut Cursor::new(&buffer), &mut tp).unwrap();
            assert_eq!(read, term, "Reading into the same pool shares the term");
        }
    }

    #[test]
    fn test_malformed_input() {
        let mut tp = TermPool::new();

        let result = read_term(&mut Cursor::new(&[42u8]), &mut tp);
        assert!(matches!(result, Err(IoError::InvalidHeader(_))));

        let result = read_term(&mut Cursor::new(&[]), &mut tp);
        assert!(matches!(result, Err(IoError::Io(_))));
    }
}
