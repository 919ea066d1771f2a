use dbfacade::config::{default_config_path, load_config};
use dbfacade::{ConnectionManager, DbConfig, DbError, OrAbort, Result, Value};
use tracing::info;

const USAGE: &str = "usage: dbfacade <sql> [param ...]

Parameters bind positionally to `?` placeholders:
  42 -> integer, 1.5 -> double, NULL -> null, x'00ff' -> blob, anything else -> text

Connection settings come from the config file (if present) and the
DB_HOST, DB_USERNAME, DB_PASSWORD, DB_DATABASE and DB_CHARSET variables.";

fn main() {
    // Logs go to stderr so stdout carries only result rows.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((sql, literals)) = args.split_first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    let params: Vec<Value> = literals.iter().map(|l| parse_param(l)).collect();

    let config = resolve_config().or_abort();
    info!(database = %config.database, "starting dbfacade");

    let mut db = ConnectionManager::new(config);
    let result = db.query(sql, &params).or_abort();

    if result.columns.is_empty() {
        println!("rows affected: {}", result.rows_affected);
        let id = db.last_insert_id().or_abort();
        if result.rows_affected > 0 && id != 0 {
            println!("last insert id: {}", id);
        }
    } else {
        for row in &result.rows {
            let line = serde_json::to_string(row).map_err(DbError::from).or_abort();
            println!("{}", line);
        }
    }

    db.close().or_abort();
}

/// Config file at the default location if it exists, then `DB_*` overrides.
fn resolve_config() -> Result<DbConfig> {
    let base = match default_config_path() {
        Some(path) if path.exists() => load_config(&path)?.database,
        _ => DbConfig::default(),
    };
    Ok(base.with_env_overrides())
}

/// Parses a command-line literal into a typed parameter.
fn parse_param(literal: &str) -> Value {
    if literal.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(i) = literal.parse::<i64>() {
        return Value::Integer(i);
    }
    // f64 parsing also accepts "inf" and "NaN"; those stay text.
    if literal.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = literal.parse::<f64>() {
            return Value::Real(f);
        }
    }
    if let Some(bytes) = literal
        .strip_prefix("x'")
        .and_then(|rest| rest.strip_suffix('\''))
        .and_then(decode_hex)
    {
        return Value::Blob(bytes);
    }
    Value::Text(literal.to_string())
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
