use std::process::ExitCode;

use clap::Parser;
use hydraulic_sizing_toolbox::i18n::{self, keys, Translator};
use hydraulic_sizing_toolbox::ui_cli::Cli;
use hydraulic_sizing_toolbox::{app, config};
use tracing_subscriber::EnvFilter;

/// 프로그램의 엔트리 포인트. 설정을 로드한 뒤 하위 명령을 실행한다.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = match config::load_or_default_at(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("오류: {err}");
            return ExitCode::FAILURE;
        }
    };
    let lang = i18n::resolve_language(&cli.lang, cfg.language.as_deref());
    let tr = Translator::new_with_pack(&lang, cfg.language_pack_dir.as_deref());

    match app::run(cli.command, &cfg, &tr) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}: {err}", tr.t(keys::ERROR_PREFIX));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
