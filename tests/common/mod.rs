#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use pgreplicate::executor::{LocalRunner, RemoteHost};
use pgreplicate::settings::Settings;
use pgreplicate::ssh::CommandOutput;
use pgreplicate::utils::command::CommandLine;

pub const REMOTE_DATABASE_YML: &str = "\
production:
  adapter: postgresql
  host: db.internal
  port: 5432
  username: app
  password: remote-secret
  database: app_production
";

/// In-memory deployment host. Every command is recorded; behavior is
/// driven by the public fields.
pub struct FakeHost {
    pub label: String,
    pub log: Rc<RefCell<Vec<CommandLine>>>,
    pub downloads: Rc<RefCell<Vec<String>>>,
    pub database_yml: String,
    pub ruby_available: bool,
    pub listing: String,
    pub fail_programs: Vec<String>,
    pub download_ok: bool,
}

impl FakeHost {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            log: Rc::new(RefCell::new(Vec::new())),
            downloads: Rc::new(RefCell::new(Vec::new())),
            database_yml: REMOTE_DATABASE_YML.to_string(),
            ruby_available: true,
            listing: String::new(),
            fail_programs: Vec::new(),
            download_ok: true,
        }
    }

    pub fn commands(&self) -> Vec<CommandLine> {
        self.log.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .map(|c| c.get_program().to_string())
            .collect()
    }

    pub fn find(&self, program: &str) -> Option<CommandLine> {
        self.log
            .borrow()
            .iter()
            .find(|c| c.get_program() == program)
            .cloned()
    }
}

impl RemoteHost for FakeHost {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&self, command: &CommandLine) -> CommandOutput {
        self.log.borrow_mut().push(command.clone());

        let program = command.get_program();
        if self.fail_programs.iter().any(|p| p == program) {
            return CommandOutput::failed(1, format!("{}: simulated failure", program));
        }

        let args = command.get_args();
        match program {
            "ruby" if args.first().map(String::as_str) == Some("-v") => {
                if self.ruby_available {
                    CommandOutput::ok("ruby 3.3.0")
                } else {
                    CommandOutput::failed(127, "ruby: command not found")
                }
            }
            "ruby" | "bundle" => CommandOutput::ok(self.database_yml.clone()),
            "ls" => CommandOutput::ok(self.listing.clone()),
            _ => CommandOutput::ok(""),
        }
    }

    fn download(&self, remote_path: &str, local_path: &Path) -> CommandOutput {
        self.downloads.borrow_mut().push(remote_path.to_string());
        if !self.download_ok {
            return CommandOutput::failed(1, "scp: connection lost");
        }
        match fs::write(local_path, format!("dump of {}", remote_path)) {
            Ok(()) => CommandOutput::ok(""),
            Err(e) => CommandOutput::failed(1, e.to_string()),
        }
    }
}

/// Local runner that records commands and what `.pgpass` held while
/// `pg_restore` ran.
#[derive(Default)]
pub struct FakeRunner {
    pub log: RefCell<Vec<CommandLine>>,
    pub pgpass_during_restore: RefCell<Option<String>>,
    pub restore_fails: bool,
    pub interpreter_output: Option<String>,
}

impl FakeRunner {
    pub fn failing_restore() -> Self {
        Self {
            restore_fails: true,
            ..Default::default()
        }
    }

    pub fn restore_command(&self) -> Option<CommandLine> {
        self.log
            .borrow()
            .iter()
            .find(|c| c.get_program() == "pg_restore")
            .cloned()
    }
}

impl LocalRunner for FakeRunner {
    fn execute(&self, command: &CommandLine) -> CommandOutput {
        self.log.borrow_mut().push(command.clone());

        match command.get_program() {
            "pg_restore" => {
                let pgpass = command
                    .get_envs()
                    .iter()
                    .find(|(k, _)| k == "PGPASSFILE")
                    .and_then(|(_, v)| fs::read_to_string(v).ok());
                *self.pgpass_during_restore.borrow_mut() = pgpass;

                if self.restore_fails {
                    CommandOutput::failed(1, "pg_restore: error: connection refused")
                } else {
                    CommandOutput::ok("")
                }
            }
            "ruby" | "bundle" => match &self.interpreter_output {
                Some(out) => CommandOutput::ok(out.clone()),
                None => CommandOutput::failed(127, "ruby: command not found"),
            },
            _ => CommandOutput::ok(""),
        }
    }
}

/// Settings rooted in `root`, with one db server and a local development
/// database.yml on disk.
pub fn settings_in(root: &Path) -> Settings {
    let settings: Settings = serde_json::from_value(serde_json::json!({
        "deploy_to": "/srv/app",
        "stage": "production",
        "local_root": root.display().to_string(),
        "servers": [{ "host": "db1.example.com", "user": "deploy" }]
    }))
    .unwrap();

    write_local_database_yml(
        root,
        "development:\n  database: app_development\n  username: dev\n  password: local-secret\n",
    );

    settings
}

pub fn write_local_database_yml(root: &Path, content: &str) {
    let dir = root.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("database.yml"), content).unwrap();
}

pub fn seed_local_dumps(settings: &Settings, names: &[&str]) {
    let dir = settings.local_backup_dir();
    fs::create_dir_all(&dir).unwrap();
    for name in names {
        fs::write(dir.join(name), "").unwrap();
    }
}

pub fn local_dump_names(settings: &Settings) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(settings.local_backup_dir()) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
