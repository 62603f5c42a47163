//! Text-format persistence for the graph topology.
//!
//! The file carries the method descriptor, the `NN` parameter, one record per
//! node (`internal_id:obj_id:` followed by space-separated friend ids), an
//! empty terminator line, and a trailing inclusive line count. Loading runs
//! two passes over the records: pass 0 rebuilds every node and validates it
//! against the supplied data sequence, pass 1 re-reads the friend lists and
//! installs edges, so every referenced node exists before any edge does.
//! Neither pass deduplicates; a round trip preserves the edge multiset
//! exactly.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use tracing::info;

use crate::{
    error::{Result, SmallWorldError},
    graph::Graph,
    index::SmallWorld,
    params::IndexParams,
    space::{DataObject, Space},
    types::{NodeId, ObjectId},
};

/// Method descriptor written to and expected from every index file.
pub const METHOD_DESC: &str = "small_world_rand";

const METHOD_FIELD: &str = "methodDesc";
const NN_FIELD: &str = "NN";
const LINE_QTY_FIELD: &str = "lineQty";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SmallWorldError + '_ {
    move |source| SmallWorldError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn format_error(line: usize, message: impl Into<String>) -> SmallWorldError {
    SmallWorldError::Format {
        line,
        message: message.into(),
    }
}

fn data_mutation(message: impl Into<String>) -> SmallWorldError {
    SmallWorldError::DataMutation {
        message: message.into(),
    }
}

/// Splits a `key=value` field line, verifying the key.
fn parse_field<'l>(line: &'l str, key: &str, line_no: usize) -> Result<&'l str> {
    let (found, value) = line
        .split_once('=')
        .ok_or_else(|| format_error(line_no, format!("expected a `{key}=` field")))?;
    if found != key {
        return Err(format_error(
            line_no,
            format!("expected field `{key}`, found `{found}`"),
        ));
    }
    Ok(value)
}

struct NodeRecord<'l> {
    node: NodeId,
    obj_id: ObjectId,
    friends: &'l str,
    line_no: usize,
}

impl<'a, S, O> SmallWorld<'a, S, O>
where
    O: DataObject,
    S: Space<O>,
{
    /// Writes the graph topology to `path`.
    ///
    /// # Errors
    /// Returns [`SmallWorldError::Io`] on file failures and
    /// [`SmallWorldError::GraphCorruption`] when a node or friend id falls
    /// outside the dataset range.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(io_error(path))?;
        let mut writer = BufWriter::new(file);
        let bound = self.data().len();
        let mut line_qty = 0_usize;

        writeln!(writer, "{METHOD_FIELD}={METHOD_DESC}").map_err(io_error(path))?;
        line_qty += 1;
        writeln!(writer, "{NN_FIELD}={}", self.params().nn()).map_err(io_error(path))?;
        line_qty += 1;

        for (obj_id, node) in self.graph().table_snapshot() {
            if node >= bound {
                return Err(SmallWorldError::GraphCorruption {
                    message: format!(
                        "unexpected node id {node} for object id {obj_id}; dataset has {bound} objects"
                    ),
                });
            }
            write!(writer, "{node}:{obj_id}:").map_err(io_error(path))?;
            for friend in self.graph().friends_of(node) {
                if friend >= bound {
                    return Err(SmallWorldError::GraphCorruption {
                        message: format!(
                            "unexpected friend id {friend} on node {node}; dataset has {bound} objects"
                        ),
                    });
                }
                write!(writer, " {friend}").map_err(io_error(path))?;
            }
            writeln!(writer).map_err(io_error(path))?;
            line_qty += 1;
        }

        // The empty line marks the end of the node records.
        writeln!(writer).map_err(io_error(path))?;
        line_qty += 1;
        writeln!(writer, "{LINE_QTY_FIELD}={}", line_qty + 1).map_err(io_error(path))?;
        writer.flush().map_err(io_error(path))?;
        info!(path = %path.display(), nodes = self.len(), "saved small-world index");
        Ok(())
    }

    /// Reconstructs an index from `path` over the same data sequence it was
    /// built on.
    ///
    /// # Errors
    /// Returns [`SmallWorldError::DataMutation`] when a record disagrees with
    /// `data`, [`SmallWorldError::Format`] for structural damage, and
    /// [`SmallWorldError::Io`] on file failures.
    pub fn load(space: &'a S, data: &'a [O], path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(io_error(path))?;
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<_>>()
            .map_err(io_error(path))?;
        let mut cursor = lines.iter().enumerate();

        let (_, method_line) = cursor
            .next()
            .ok_or_else(|| format_error(1, "missing method descriptor"))?;
        let method = parse_field(method_line, METHOD_FIELD, 1)?;
        if method != METHOD_DESC {
            return Err(format_error(
                1,
                format!("index was created by a different method: `{method}`"),
            ));
        }
        let (_, nn_line) = cursor
            .next()
            .ok_or_else(|| format_error(2, "missing NN field"))?;
        let nn: usize = parse_field(nn_line, NN_FIELD, 2)?
            .trim()
            .parse()
            .map_err(|_| format_error(2, "NN is not an unsigned integer"))?;
        let params =
            IndexParams::new(nn, nn).map_err(|_| format_error(2, format!("invalid NN `{nn}`")))?;

        // Collect node records up to the empty terminator line.
        let mut records = Vec::new();
        let mut terminated = false;
        let mut consumed = 2_usize;
        for (index, line) in cursor.by_ref() {
            let line_no = index + 1;
            consumed += 1;
            if line.is_empty() {
                terminated = true;
                break;
            }
            records.push(Self::parse_record(data, line, line_no)?);
        }
        if !terminated {
            return Err(format_error(
                consumed,
                "node records are not terminated by an empty line",
            ));
        }

        let (_, qty_line) = cursor
            .next()
            .ok_or_else(|| format_error(consumed + 1, "missing lineQty field"))?;
        consumed += 1;
        let expected_lines: usize = parse_field(qty_line, LINE_QTY_FIELD, consumed)?
            .trim()
            .parse()
            .map_err(|_| format_error(consumed, "lineQty is not an unsigned integer"))?;
        if consumed != expected_lines {
            return Err(format_error(
                consumed,
                format!("file declares {expected_lines} lines but {consumed} were read"),
            ));
        }

        // Pass 0: create every node and pin the entry point.
        let graph = Graph::with_len(data.len());
        for record in &records {
            graph.clear_friends(record.node);
            graph.publish(record.obj_id, record.node);
            if record.node == 0 {
                graph.set_entry(0);
            }
        }
        if !records.is_empty() && graph.entry().is_none() {
            return Err(format_error(
                3,
                "node records do not include the entry point (internal id 0)",
            ));
        }

        // Pass 1: re-read the friend lists now that every endpoint exists.
        for record in &records {
            for raw in record.friends.split_whitespace() {
                let friend: NodeId = raw.parse().map_err(|_| {
                    format_error(
                        record.line_no,
                        format!("friend id `{raw}` is not an unsigned integer"),
                    )
                })?;
                if friend >= data.len() {
                    return Err(format_error(
                        record.line_no,
                        format!(
                            "friend id {friend} is outside the dataset range [0, {})",
                            data.len()
                        ),
                    ));
                }
                graph.push_friend(record.node, friend);
            }
        }

        info!(
            path = %path.display(),
            nodes = records.len(),
            "loaded small-world index"
        );
        Ok(Self::from_parts(space, data, params, graph))
    }

    fn parse_record<'l>(data: &[O], line: &'l str, line_no: usize) -> Result<NodeRecord<'l>> {
        let (node_part, rest) = line
            .split_once(':')
            .ok_or_else(|| format_error(line_no, "record is missing the first `:` separator"))?;
        let (obj_part, friends) = rest
            .split_once(':')
            .ok_or_else(|| format_error(line_no, "record is missing the second `:` separator"))?;
        let node: i64 = node_part
            .trim()
            .parse()
            .map_err(|_| format_error(line_no, format!("node id `{node_part}` is not an integer")))?;
        let obj_id: ObjectId = obj_part
            .trim()
            .parse()
            .map_err(|_| format_error(line_no, format!("object id `{obj_part}` is not an integer")))?;
        if node < 0 || node as usize >= data.len() {
            return Err(data_mutation(format!(
                "unexpected node id {node} for object id {obj_id}; dataset has {} objects",
                data.len()
            )));
        }
        let node = node as NodeId;
        let found = data[node].id();
        if found != obj_id {
            return Err(data_mutation(format!(
                "object id {found} at position {node} does not match recorded object id {obj_id}"
            )));
        }
        Ok(NodeRecord {
            node,
            obj_id,
            friends,
            line_no,
        })
    }
}
