//! DBMS Client Driver
//!
//! Client for SQL-like database servers speaking a line-oriented JSON
//! protocol: every request and every response is one newline-terminated
//! JSON message over TCP.
//!
//! # Examples
//!
//! Execute and fetch one row at a time:
//!
//! ```no_run
//! use sqline::{Args, Connection};
//!
//! # async fn app() -> sqline::Result<()> {
//! let mut conn = Connection::connect("localhost", 5657).await?;
//!
//! let mut cursor = conn.cursor().await?;
//! cursor
//!     .execute("SELECT id, name FROM users WHERE name = %s", &Args::scalar("O'Brien"))
//!     .await?;
//!
//! while let Some(row) = cursor.fetch_one().await? {
//!     let name: String = row.try_get("name")?;
//!     println!("{name}");
//! }
//!
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Arguments are escaped before they are substituted into the query, so a
//! hostile string survives only as an inert literal:
//!
//! ```
//! use sqline::Args;
//!
//! let rendered = sqline::sql::substitute(
//!     "SELECT * FROM t WHERE note = %(note)s",
//!     &Args::named([("note", "it's\nfine")]),
//! ).unwrap();
//!
//! assert_eq!(rendered, r"SELECT * FROM t WHERE note = 'it\'s\nfine'");
//! ```

mod common;
mod net;

// Protocol
pub mod message;

// Encoding
pub mod escape;
pub mod convert;
pub mod sql;

// Component
pub mod row;

// Operation
pub mod transport;
pub mod cursor;

// Connection
pub mod connection;
mod stream;

mod error;


pub use escape::{IntoValue, Value};
pub use sql::Args;
pub use row::{Decode, DecodeError, Field, Row};

pub use message::CursorId;
pub use cursor::{Cursor, RowStream};
pub use connection::{Config, Connection};
pub use error::{Error, ErrorKind, Result};
