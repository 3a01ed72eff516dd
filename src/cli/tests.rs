//! Unit tests for CLI commands

use crate::cli::{bind_address_books, Cli, Commands};
use crate::config::AppConfig;
use crate::generator::{Host, InstallStyle};
use clap::Parser;

#[test]
fn test_serve_command_flags() {
    let cli = Cli::try_parse_from([
        "restdef",
        "serve",
        "--config",
        "restdef.yaml",
        "--addr",
        "127.0.0.1:9000",
        "--style",
        "page",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve {
            config,
            addr,
            style,
        } => {
            assert_eq!(config.unwrap().to_string_lossy(), "restdef.yaml");
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
            assert_eq!(style, Some(InstallStyle::Page));
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_serve_without_flags() {
    let cli = Cli::try_parse_from(["restdef", "serve"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Serve {
            config: None,
            addr: None,
            style: None
        }
    ));
}

#[test]
fn test_unknown_style_rejected() {
    assert!(Cli::try_parse_from(["restdef", "routes", "--style", "servlet"]).is_err());
}

#[test]
fn test_bind_address_books_installs_both_styles() {
    let host = Host::new();
    let definitions = bind_address_books(&AppConfig::default(), &host).unwrap();
    assert_eq!(definitions.len(), 2);
    assert_eq!(
        host.bound_paths(),
        vec!["/actions/addressbook".to_string(), "/addressbook".to_string()]
    );
    // GET, PUT, POST, DELETE per definition
    assert_eq!(host.route_count(), 8);
}

#[test]
fn test_bind_without_action_path() {
    let mut config = AppConfig::default();
    config.service.action_base_path = None;
    config.server.style = InstallStyle::Page;
    let host = Host::new();
    let definitions = bind_address_books(&config, &host).unwrap();
    assert_eq!(definitions.len(), 1);
    assert!(host
        .routes()
        .iter()
        .all(|r| r.path_pattern == "/addressbook/:service/:id"));
}

#[test]
fn test_bind_same_path_twice_fails() {
    let mut config = AppConfig::default();
    config.service.action_base_path = Some(config.service.base_path.clone());
    let err = bind_address_books(&config, &Host::new()).unwrap_err();
    assert!(err.to_string().contains("Failed to bind"));
}
