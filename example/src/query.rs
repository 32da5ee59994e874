use futures::TryStreamExt;
use time::{Date, Month, PrimitiveDateTime, Time};

use sqline::{Args, Connection, Result, Value};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    // Execute

    let mut cursor = conn.cursor().await?;

    cursor
        .execute("CREATE TABLE demo(id int, name text, joined datetime)", &Args::None)
        .await?;

    let joined = PrimitiveDateTime::new(
        Date::from_calendar_date(2024, Month::March, 1).unwrap(),
        Time::MIDNIGHT,
    );

    cursor
        .execute(
            "INSERT INTO demo(id, name, joined) VALUES (%s, %s, %s)",
            &Args::positional([Value::Int(1), Value::Str("Deez".into()), Value::DateTime(joined)]),
        )
        .await?;

    cursor
        .execute(
            "INSERT INTO demo(id, name, joined) VALUES (%(id)s, %(name)s, %(joined)s)",
            &Args::named([
                ("id", Value::Int(2)),
                ("name", Value::Str("Foo".into())),
                ("joined", Value::DateTime(joined)),
            ]),
        )
        .await?;

    // Queries

    cursor.execute("SELECT id, name, joined FROM demo", &Args::None).await?;

    while let Some(row) = cursor.fetch_one().await? {
        let id: i64 = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let joined: PrimitiveDateTime = row.try_get("joined")?;
        let raw: serde_json::Value = row.try_get("name")?;
        tracing::info!("row {id}: {name} (joined {joined:?}, raw {raw})");
    }

    // Streamed in server-sent order, fetched in batches behind the scenes

    cursor.execute("SELECT id FROM demo", &Args::None).await?;

    let ids: Vec<i64> = cursor
        .rows()
        .and_then(|row| std::future::ready(row.try_get::<_, i64>(0).map_err(Into::into)))
        .try_collect()
        .await?;

    assert_eq!(ids.len(), 2);

    cursor.execute("DROP TABLE demo", &Args::None).await?;

    drop(cursor);
    conn.close().await?;

    Ok(())
}
