use sqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), sqlite::Error> {
    conn.execute(
        "
        CREATE TABLE IF NOT EXISTS postings (
            chat_id       INTEGER NOT NULL,
            keyword       TEXT NOT NULL,
            message_id    INTEGER NOT NULL,
            timestamp     INTEGER NOT NULL,
            PRIMARY KEY (chat_id, keyword, message_id)
        );

        CREATE INDEX IF NOT EXISTS idx_postings_recency
            ON postings (chat_id, keyword, timestamp DESC, message_id DESC);
        CREATE INDEX IF NOT EXISTS idx_postings_message
            ON postings (chat_id, message_id);

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}
