//! Restartable streaming of the edge relation.
//!
//! Graph kernels are polymorphic over [`LinkSource`], so the store-backed
//! stream and the in-memory variant (tests, file-fed graphs) are
//! interchangeable.

use tracing::debug;

use crate::error::{PageDbError, Result};
use crate::schema;

/// One outbound link, as a pair of dense page indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edge {
    pub from: u64,
    pub to: u64,
}

/// Stream position after the most recent call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    /// Positioned before the first edge.
    #[default]
    Init,
    /// The last `next` call produced a valid edge.
    Next,
    /// The stream is exhausted.
    End,
    /// A decode or I/O failure occurred; the stream stays in this state.
    Error,
}

/// A restartable sequence of edges.
pub trait LinkSource {
    /// Repositions before the first edge. May be called repeatedly.
    fn reset(&mut self) -> StreamState;

    /// Advances to the next edge, writing it into `out` on success.
    fn next(&mut self, out: &mut Edge) -> StreamState;

    /// Resets, then collects every remaining edge. Convenience for tests
    /// and tooling; kernels iterate incrementally instead.
    fn drain(&mut self) -> Result<Vec<Edge>> {
        if self.reset() == StreamState::Error {
            return Err(PageDbError::Corruption("link stream failed to reset".into()));
        }
        let mut edges = Vec::new();
        let mut edge = Edge::default();
        loop {
            match self.next(&mut edge) {
                StreamState::Next => edges.push(edge),
                StreamState::End => return Ok(edges),
                StreamState::Error | StreamState::Init => {
                    return Err(PageDbError::Corruption("link stream failed".into()))
                }
            }
        }
    }
}

type LinksTable = redb::ReadOnlyTable<u64, &'static [u8]>;
type LinksCursor = redb::Range<'static, u64, &'static [u8]>;

/// Edge stream over the `links` index of a store.
///
/// Holds a read snapshot fixed at creation time: writers that commit while
/// the stream is alive do not affect what it yields, and `reset` re-reads
/// the same snapshot. Edges come out in increasing source-index order and,
/// within a source, in stored page order.
pub struct PageDBLinkStream {
    cursor: Option<LinksCursor>,
    table: LinksTable,
    from: u64,
    to: Vec<u64>,
    i_to: usize,
    state: StreamState,
    failure: Option<PageDbError>,
}

impl PageDBLinkStream {
    pub(crate) fn new(db: &redb::Database) -> Result<Self> {
        let txn = db.begin_read()?;
        let table = txn.open_table(schema::LINKS)?;
        let mut stream = Self {
            cursor: None,
            table,
            from: 0,
            to: Vec::new(),
            i_to: 0,
            state: StreamState::Init,
            failure: None,
        };
        if stream.reset() == StreamState::Error {
            return Err(stream.take_failure());
        }
        Ok(stream)
    }

    /// Current state without advancing.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Takes the failure behind an `Error` state, if one was captured.
    pub fn take_failure(&mut self) -> PageDbError {
        self.failure
            .take()
            .unwrap_or_else(|| PageDbError::Corruption("link stream failed".into()))
    }

    fn fail(&mut self, err: PageDbError) -> StreamState {
        debug!(error = %err, "link_stream.error");
        self.failure = Some(err);
        self.state = StreamState::Error;
        StreamState::Error
    }
}

impl LinkSource for PageDBLinkStream {
    fn reset(&mut self) -> StreamState {
        match self.table.range::<u64>(..) {
            Ok(cursor) => {
                self.cursor = Some(cursor);
                self.to.clear();
                self.i_to = 0;
                self.from = 0;
                self.state = StreamState::Init;
                StreamState::Init
            }
            Err(err) => self.fail(err.into()),
        }
    }

    fn next(&mut self, out: &mut Edge) -> StreamState {
        match self.state {
            StreamState::Error => return StreamState::Error,
            StreamState::End => return StreamState::End,
            StreamState::Init | StreamState::Next => {}
        }
        loop {
            if self.i_to < self.to.len() {
                out.from = self.from;
                out.to = self.to[self.i_to];
                self.i_to += 1;
                self.state = StreamState::Next;
                return StreamState::Next;
            }
            // Buffer exhausted: move the cursor to the next source. Sources
            // with empty edge lists are skipped, not emitted.
            let entry = match self.cursor.as_mut() {
                Some(cursor) => cursor.next(),
                None => None,
            };
            match entry {
                None => {
                    self.state = StreamState::End;
                    return StreamState::End;
                }
                Some(Ok((key, value))) => {
                    self.from = key.value();
                    match schema::decode_links(value.value()) {
                        Ok(targets) => {
                            self.to = targets;
                            self.i_to = 0;
                        }
                        Err(err) => return self.fail(err),
                    }
                }
                Some(Err(err)) => return self.fail(err.into()),
            }
        }
    }
}

/// In-memory edge sequence with the same interface as the store-backed
/// stream. Emits edges in the order given.
#[derive(Clone, Debug, Default)]
pub struct MemoryLinkStream {
    edges: Vec<Edge>,
    pos: usize,
    state: StreamState,
}

impl MemoryLinkStream {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self {
            edges,
            pos: 0,
            state: StreamState::Init,
        }
    }

    pub fn from_pairs(pairs: &[(u64, u64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(from, to)| Edge { from, to })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Current state without advancing.
    pub fn state(&self) -> StreamState {
        self.state
    }
}

impl LinkSource for MemoryLinkStream {
    fn reset(&mut self) -> StreamState {
        self.pos = 0;
        self.state = StreamState::Init;
        StreamState::Init
    }

    fn next(&mut self, out: &mut Edge) -> StreamState {
        if self.pos < self.edges.len() {
            *out = self.edges[self.pos];
            self.pos += 1;
            self.state = StreamState::Next;
            StreamState::Next
        } else {
            self.state = StreamState::End;
            StreamState::End
        }
    }
}
