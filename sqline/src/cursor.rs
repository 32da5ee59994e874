//! Server-side cursor operation.
use futures_core::Stream;
use std::{
    collections::VecDeque,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};

use crate::{
    Result,
    common::{span, verbose},
    escape::Value,
    message::{CursorCreated, CursorId, DEFAULT_FETCH_NUM, Envelope, Request, RowSet},
    row::{Field, Row},
    sql::{self, Args},
    transport::{Transport, TransportExt},
};

/// Per-query state on top of one connection.
///
/// A cursor borrows its connection mutably for its whole lifetime: the
/// protocol cannot disambiguate interleaved traffic, so two cursors can
/// never talk at once, and a cursor cannot outlive its connection.
///
/// Rows arrive in batches. [`fetch_one`][Cursor::fetch_one] and the
/// [`rows`][Cursor::rows] stream deliver them in server-sent order.
#[derive(Debug)]
pub struct Cursor<'c, T> {
    io: &'c mut T,
    id: CursorId,
    fields: Arc<[Field]>,
    row_count: u64,
    has_next: bool,
    pending: VecDeque<Row>,
}

impl<'c, T: Transport> Cursor<'c, T> {
    pub(crate) async fn create(io: &'c mut T) -> Result<Cursor<'c, T>> {
        span!("create_cursor");
        io.send(&Request::CreateCursor);
        io.flush().await?;
        let created: CursorCreated = io.recv().await?;
        verbose!("cursor {} created", created.cur_id);

        Ok(Cursor {
            io,
            id: created.cur_id,
            fields: Vec::new().into(),
            row_count: 0,
            has_next: true,
            pending: VecDeque::new(),
        })
    }

    /// Server-assigned cursor id.
    pub fn id(&self) -> &CursorId {
        &self.id
    }

    /// Column descriptors from the most recent response.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Row count last reported by the server.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Returns `false` once the server has no further rows for this cursor.
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Escape a single value as a literal token.
    pub fn escape(&self, value: &Value) -> Result<String> {
        Ok(value.escape()?)
    }

    /// Render `args` into `query` without executing it.
    ///
    /// Every argument is escaped before substitution; a raw value never
    /// reaches the query string.
    pub fn mogrify(&self, query: &str, args: &Args) -> Result<String> {
        sql::substitute(query, args)
    }

    /// Execute a query, dropping any rows pending from a previous one.
    pub async fn execute(&mut self, query: &str, args: &Args) -> Result<()> {
        span!("execute");
        let query = sql::substitute(query, args)?;
        self.has_next = true;
        self.pending.clear();

        self.io.send(&Request::Query { id: &self.id, query: &query });
        self.io.flush().await?;
        let response: Envelope = self.io.recv().await?;
        self.absorb(response);
        Ok(())
    }

    /// Fetch exactly one row.
    ///
    /// Returns [`None`] once the cursor is exhausted, without touching the
    /// network.
    pub async fn fetch_one(&mut self) -> Result<Option<Row>> {
        if !self.has_next {
            return Ok(None);
        }
        self.fetch_query(1).await?;
        Ok(self.pending.pop_front())
    }

    /// Fetch the next batch of at most `num` rows.
    ///
    /// An empty batch means the cursor is exhausted.
    pub async fn fetch(&mut self, num: u32) -> Result<Vec<Row>> {
        if !self.has_next {
            return Ok(Vec::new());
        }
        self.fetch_query(num).await?;
        Ok(self.pending.drain(..).collect())
    }

    /// Drain every remaining row.
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        rows.extend(self.pending.drain(..));
        while self.has_next {
            self.fetch_query(DEFAULT_FETCH_NUM).await?;
            rows.extend(self.pending.drain(..));
        }
        Ok(rows)
    }

    /// Remaining rows as a lazy [`Stream`].
    ///
    /// The stream is finite and non-restartable; a new
    /// [`execute`][Cursor::execute] starts a fresh result. Batches of
    /// [`DEFAULT_FETCH_NUM`] are requested as the buffer runs dry.
    pub fn rows(&mut self) -> RowStream<'_, 'c, T> {
        RowStream { cursor: self, phase: Phase::Idle }
    }

    async fn fetch_query(&mut self, num: u32) -> Result<()> {
        span!("fetch");
        self.io.send(&Request::Fetch { id: &self.id, num });
        self.io.flush().await?;
        let set: RowSet = self.io.recv().await?;
        self.apply(set);
        Ok(())
    }

    /// A fetch response replaces the pending buffer wholesale.
    fn apply(&mut self, set: RowSet) {
        self.fields = set.fields.into();
        self.row_count = set.row_count;
        self.has_next = !set.data.is_empty();
        self.pending = set
            .data
            .into_iter()
            .map(|values| Row::new(self.fields.clone(), values))
            .collect();
    }

    /// Query responses are only required to acknowledge; any result page
    /// they do carry is kept.
    fn absorb(&mut self, envelope: Envelope) {
        if let Some(fields) = envelope.fields {
            self.fields = fields.into();
        }
        if let Some(row_count) = envelope.row_count {
            self.row_count = row_count;
        }
        if let Some(data) = envelope.data {
            self.has_next = !data.is_empty();
            self.pending = data
                .into_iter()
                .map(|values| Row::new(self.fields.clone(), values))
                .collect();
        }
    }
}

/// Lazy row iteration, refilled in batches of [`DEFAULT_FETCH_NUM`].
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct RowStream<'a, 'c, T> {
    cursor: &'a mut Cursor<'c, T>,
    phase: Phase,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Flush,
    Recv,
}

impl<T: Transport> Stream for RowStream<'_, '_, T> {
    type Item = Result<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();

        loop {
            match me.phase {
                Phase::Idle => {
                    if let Some(row) = me.cursor.pending.pop_front() {
                        return Poll::Ready(Some(Ok(row)));
                    }
                    if !me.cursor.has_next {
                        return Poll::Ready(None);
                    }
                    me.cursor
                        .io
                        .send(&Request::Fetch { id: &me.cursor.id, num: DEFAULT_FETCH_NUM });
                    me.phase = Phase::Flush;
                }
                Phase::Flush => {
                    if let Err(err) = ready!(me.cursor.io.poll_flush(cx)) {
                        me.cursor.has_next = false;
                        me.phase = Phase::Idle;
                        return Poll::Ready(Some(Err(err.into())));
                    }
                    me.phase = Phase::Recv;
                }
                Phase::Recv => {
                    match ready!(me.cursor.io.poll_recv::<RowSet>(cx)) {
                        Ok(set) => {
                            me.cursor.apply(set);
                            me.phase = Phase::Idle;
                        }
                        Err(err) => {
                            me.cursor.has_next = false;
                            me.phase = Phase::Idle;
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
            }
        }
    }
}
