use std::io::Write;
use ledger_app_core::app;
use app::{Address, AppId, AssetId, Config, Decision, MemoryLedger, Transaction};
use app::{Serialize, Deserialize};
use app::constants::{OnCompletion, TxnType};

/// Parses the `APP_LOG` value, warnings and errors are shown by default.
fn log_level(var: Option<&str>) -> slog::Level {
    match var {
        Some(level) => level.parse::<slog::Level>().unwrap_or_else(|_| panic!("invalid log level \"{}\"", level)),
        None => slog::Level::Warning,
    }
}

fn logger() -> slog::Logger {
    use slog::Drain;

    let level = log_level(std::env::var("APP_LOG").ok().as_deref());
    let decorator = slog_term::PlainSyncDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    slog::Logger::root(drain, slog::o!())
}

fn config() -> Config {
    Config::from_lookup(|key| std::env::var(key).ok())
}

fn next_string(args: &mut std::env::ArgsOs, what: &str) -> String {
    args.next()
        .unwrap_or_else(|| panic!("missing {}", what))
        .into_string()
        .unwrap_or_else(|_| panic!("{} is not UTF-8", what))
}

fn next_address(args: &mut std::env::ArgsOs, what: &str) -> Address {
    next_string(args, what)
        .parse::<Address>()
        .unwrap_or_else(|error| panic!("invalid {}: {}", what, error))
}

fn next_u64(args: &mut std::env::ArgsOs, what: &str) -> u64 {
    next_string(args, what)
        .parse::<u64>()
        .unwrap_or_else(|error| panic!("invalid {}: {}", what, error))
}

/// Parses a call argument, the prefix says how the rest is encoded.
fn parse_call_arg(arg: &str) -> Vec<u8> {
    use bitcoin::hashes::hex::FromHex;
    use base64::Engine as _;

    if let Some(text) = arg.strip_prefix("str:") {
        text.as_bytes().to_vec()
    } else if let Some(num) = arg.strip_prefix("int:") {
        num.parse::<u64>().expect("invalid integer argument").to_be_bytes().to_vec()
    } else if let Some(hex) = arg.strip_prefix("hex:") {
        Vec::<u8>::from_hex(hex).expect("invalid hex argument")
    } else if let Some(b64) = arg.strip_prefix("b64:") {
        base64::engine::general_purpose::STANDARD.decode(b64).expect("invalid base64 argument")
    } else {
        panic!("argument \"{}\" has unknown encoding (use str:, int:, hex: or b64:)", arg)
    }
}

fn write_non_existing(path: &std::ffi::OsStr, data: &[u8]) {
    let mut file = std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .unwrap_or_else(|error| panic!("failed to open {:?}: {:?}", path, error));
    file.write_all(data).expect("failed to write");
}

fn atomic_update(path: &std::ffi::OsStr, data: &[u8]) {
    let mut tmp_ledger_file = path.to_owned();
    tmp_ledger_file.push(".tmp");
    // sync_data needs the `File`
    let mut file = std::fs::File::create(&tmp_ledger_file).expect("failed to open temporary ledger file");
    file.write_all(data).expect("failed to write new ledger");
    file.sync_data().expect("failed to ensure the file is on disk");
    drop(file);
    std::fs::rename(tmp_ledger_file, path).expect("failed to commit the ledger file");
}

fn load_ledger(path: &std::ffi::OsStr) -> MemoryLedger {
    let bytes = std::fs::read(path).expect("failed to read ledger file");
    MemoryLedger::deserialize_with_header(&mut &*bytes).expect("failed to deserialize ledger")
}

fn store_ledger(path: &std::ffi::OsStr, ledger: &MemoryLedger) {
    let mut buf = Vec::new();
    ledger.serialize_with_header(&mut buf);
    atomic_update(path, &buf);
}

fn ledger_init(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    let mut buf = Vec::new();
    MemoryLedger::new().serialize_with_header(&mut buf);
    write_non_existing(&ledger_file, &buf);
}

fn ledger_fund(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    let account = next_address(&mut args, "account");
    let amount = next_u64(&mut args, "amount");

    let mut ledger = load_ledger(&ledger_file);
    ledger.fund(account, amount).unwrap_or_else(|error| panic!("failed to fund: {}", error));
    store_ledger(&ledger_file, &ledger);
}

fn ledger_asset_create(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    let asset = AssetId(next_u64(&mut args, "asset id"));
    let creator = next_address(&mut args, "creator");
    let total = next_u64(&mut args, "total supply");

    let mut ledger = load_ledger(&ledger_file);
    ledger.create_asset(asset, creator, total).unwrap_or_else(|error| panic!("failed to create asset: {}", error));
    store_ledger(&ledger_file, &ledger);
}

fn ledger_asset_freeze(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    let asset = AssetId(next_u64(&mut args, "asset id"));
    let frozen = match &*next_string(&mut args, "freeze flag (true or false)") {
        "true" => true,
        "false" => false,
        flag => panic!("invalid freeze flag \"{}\" (must be true or false)", flag),
    };

    let mut ledger = load_ledger(&ledger_file);
    ledger.set_frozen(asset, frozen).unwrap_or_else(|error| panic!("failed to freeze asset: {}", error));
    store_ledger(&ledger_file, &ledger);
}

fn ledger_decode(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    println!("{:#?}", load_ledger(&ledger_file));
}

fn ledger(mut args: std::env::ArgsOs) {
    let command = args.next()
        .expect("missing subcommand (init, fund, asset-create, asset-freeze, decode)")
        .into_string()
        .expect("unrecognized command");

    match &*command {
        "init" => ledger_init(args),
        "fund" => ledger_fund(args),
        "asset-create" => ledger_asset_create(args),
        "asset-freeze" => ledger_asset_freeze(args),
        "decode" => ledger_decode(args),
        _ => panic!("unknown command \"{}\"", command),
    }
}

fn execute(ledger_file: &std::ffi::OsStr, txn: &Transaction) {
    let mut ledger = load_ledger(ledger_file);
    let receipt = ledger.execute(txn, &config(), &logger())
        .unwrap_or_else(|error| match error {
            app::ledger::ExecuteError::Invocation(error) => panic!("invocation failed: {}", error),
            error => panic!("{}", error),
        });

    println!("application: {}", receipt.application_id);
    println!("decision: {:?}", receipt.decision);
    for log in &receipt.logs {
        println!("log: {}", String::from_utf8_lossy(log));
    }
    for inner in &receipt.inner_transactions {
        println!("inner: {}", inner.explain());
    }

    if receipt.decision == Decision::Accept {
        store_ledger(ledger_file, &ledger);
    }
}

fn app_create(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    let sender = next_address(&mut args, "sender");
    execute(&ledger_file, &Transaction::create(sender));
}

fn app_call(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    let app_id = AppId(next_u64(&mut args, "application id"));
    let sender = next_address(&mut args, "sender");
    let on_completion = next_string(&mut args, "on-completion")
        .parse::<OnCompletion>()
        .unwrap_or_else(|error| panic!("invalid on-completion: {}", error));
    let type_enum = next_string(&mut args, "transaction type")
        .parse::<TxnType>()
        .unwrap_or_else(|error| panic!("invalid transaction type: {}", error));
    let note = match next_string(&mut args, "note (- for none)") {
        dash if dash == "-" => Vec::new(),
        note => note.into_bytes(),
    };
    let call_args = args
        .map(|arg| parse_call_arg(&arg.into_string().expect("call argument is not UTF-8")))
        .collect::<Vec<_>>();

    let txn = Transaction::call(sender, app_id, on_completion)
        .with_type(type_enum)
        .with_note(note)
        .with_args(call_args);
    execute(&ledger_file, &txn);
}

fn app_state(mut args: std::env::ArgsOs) {
    let ledger_file = args.next().expect("missing ledger file");
    let app_id = AppId(next_u64(&mut args, "application id"));

    let ledger = load_ledger(&ledger_file);
    let state = ledger.application(app_id).unwrap_or_else(|| panic!("application {} does not exist", app_id));
    println!("address: {}", Address::for_application(app_id));
    println!("version: {}", state.version());
    println!("admin: {}", state.admin());
}

fn application(mut args: std::env::ArgsOs) {
    let command = args.next()
        .expect("missing subcommand (create, call, state)")
        .into_string()
        .expect("unrecognized command");

    match &*command {
        "create" => app_create(args),
        "call" => app_call(args),
        "state" => app_state(args),
        _ => panic!("unknown command \"{}\"", command),
    }
}

fn print(mut args: std::env::ArgsOs) {
    let subject = args.next()
        .expect("missing subject")
        .into_string()
        .expect("unrecognized subject");

    match &*subject {
        "avm-version" => println!("{}", app::constants::TARGET_AVM_VERSION),
        _ => panic!("unknown subject \"{}\"", subject),
    }
}

fn main() {
    let mut args = std::env::args_os();
    let _program_name = args.next().expect("missing program name");
    let command = args.next()
        .expect("missing subcommand (ledger, app, print)")
        .into_string()
        .expect("unrecognized command");

    match &*command {
        "ledger" => ledger(args),
        "app" => application(args),
        "print" => print(args),
        _ => panic!("unknown command \"{}\"", command),
    }
}

#[cfg(test)]
mod tests {
    use super::log_level;

    #[test]
    fn log_level_from_env_value() {
        assert_eq!(log_level(None), slog::Level::Warning);
        assert_eq!(log_level(Some("debug")), slog::Level::Debug);
        assert_eq!(log_level(Some("info")), slog::Level::Info);
    }

    #[test]
    #[should_panic(expected = "invalid log level")]
    fn unknown_log_level_is_refused() {
        log_level(Some("chatty"));
    }
}
