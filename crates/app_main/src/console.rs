//! Line-oriented console front end
//!
//! Every stdin line is a key name from the keymap, a command id
//! (`meta.rate:3`), or a `:` console command. Scans run on the blocking pool
//! and report back through a channel; the persistence debounce is driven by
//! a timer armed at the next flush deadline.

use anyhow::Result;
use app_core::{
    AppError, AppState, Command, CullMode, FolderLoad, FolderLoadTicket, Keymap, MetaChange,
    NoticeLevel, PhotoView, ViewMode,
};
use app_fs::FsError;
use ipc_proto::{AlbumId, PhotoMeta, ScanResult, MAX_RATING};
use std::path::Path;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

type ScanOutcome = (FolderLoadTicket, Result<ScanResult, FsError>);

const HELP: &str = "\
keys       Right/Space next, Left prev, 0-5 rate, r/y/g/b/p/c label, f flag, x reject,
           C cull, G grid, v viewer, Escape back, Tab cull mode, F flagged filter
commands   any command id, e.g. meta.rate:4, filter.rating:3, filter.label:red
:open DIR                  load a folder
:ls                        list visible photos
:dirs [DIR]                list subfolders
:select N | none           grid selection (1-based)
:view grid|cull|viewer     switch view
:ws [add|rm|use PATH]      workspaces
:album [new NAME | rm A | add A | remove A | open A | close]
:rename NAME               rename the current photo
:exif                      EXIF of the current photo
:status                    status line
:quit                      flush and exit";

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Console {
    state: AppState,
    keymap: Keymap,
    scans: mpsc::UnboundedSender<ScanOutcome>,
}

/// Run until stdin closes or `:quit`, then flush pending writes
pub async fn run(state: AppState, folder: Option<String>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let keymap = Keymap::from_bindings(&state.config().keybindings);
    let mut console = Console {
        state,
        keymap,
        scans: tx,
    };

    match folder {
        Some(folder) => console.report(|c| c.add_workspace(&folder)),
        None => {
            if let Some(ticket) = console.state.startup_ticket() {
                console.spawn_scan(ticket);
            }
        }
    }
    println!("Type :help for commands");
    console.print_notices();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let deadline = console.state.next_flush_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if console.handle_line(&line) == Flow::Quit {
                    break;
                }
            }
            Some((ticket, result)) = rx.recv() => console.finish_scan(ticket, result),
            _ = wait_for(deadline) => {
                let report = console.state.poll_persistence();
                tracing::trace!(written = report.written.len(), "Debounce fired");
            }
        }
        console.print_notices();
    }

    let report = console.state.flush_all();
    console.print_notices();
    tracing::info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "Pending writes flushed"
    );
    Ok(())
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
        None => std::future::pending().await,
    }
}

impl Console {
    fn spawn_scan(&self, ticket: FolderLoadTicket) {
        println!("Scanning {} ...", ticket.folder());
        let backend = self.state.backend();
        let tx = self.scans.clone();
        tokio::task::spawn_blocking(move || {
            let result = backend.scan_folder(Path::new(ticket.folder()));
            if tx.send((ticket, result)).is_err() {
                tracing::debug!("Scan finished after shutdown");
            }
        });
    }

    fn finish_scan(&mut self, ticket: FolderLoadTicket, result: Result<ScanResult, FsError>) {
        // Failures are already queued as notices
        if let Ok(FolderLoad::Applied { .. }) = self.state.complete_folder_load(ticket, result) {
            println!("{}", status_line(&self.state));
        }
    }

    fn print_notices(&mut self) {
        for notice in self.state.take_notices() {
            match notice.level {
                NoticeLevel::Info => println!("note: {}", notice.message),
                NoticeLevel::Warning => println!("warning: {}", notice.message),
            }
        }
    }

    /// Run a console action and print its error, if any
    fn report(&mut self, action: impl FnOnce(&mut Self) -> Result<(), AppError>) {
        if let Err(e) = action(self) {
            if !e.is_recoverable() {
                tracing::error!("Unexpected failure: {}", e);
            }
            println!("error: {}", e.user_message());
        }
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            println!("{}", status_line(&self.state));
            return Flow::Continue;
        }
        if let Some(rest) = line.strip_prefix(':') {
            return self.console_command(rest);
        }

        let command = self
            .keymap
            .resolve(line)
            .cloned()
            .or_else(|| Command::parse(line));
        match command {
            Some(cmd) => self.report(|c| c.execute(&cmd)),
            None => println!("Unknown key or command: {}", line),
        }
        Flow::Continue
    }

    fn execute(&mut self, cmd: &Command) -> Result<(), AppError> {
        match self.state.execute(cmd)? {
            Some(change) => println!("{}", describe_change(&change)),
            None => println!("{}", status_line(&self.state)),
        }
        Ok(())
    }

    fn console_command(&mut self, input: &str) -> Flow {
        let (name, rest) = split_word(input);
        if name.is_empty() {
            return Flow::Continue;
        }

        if matches!(name, "q" | "quit") {
            return Flow::Quit;
        }

        self.report(|c| match (name, rest) {
            ("h" | "help", _) => {
                println!("{}", HELP);
                Ok(())
            }
            ("open", folder) if !folder.is_empty() => {
                let ticket = c.state.begin_folder_load(folder);
                c.spawn_scan(ticket);
                Ok(())
            }
            ("ls", "") => {
                c.list_photos();
                Ok(())
            }
            ("dirs", folder) => c.list_dirs(Some(folder).filter(|f| !f.is_empty())),
            ("select", "none") => {
                c.state.select(None);
                Ok(())
            }
            ("select", n) if !n.is_empty() => {
                let position = one_based(n)?;
                if c.state.select(Some(position)) {
                    println!("{}", status_line(&c.state));
                }
                Ok(())
            }
            ("view", mode) if !mode.is_empty() => c.switch_view(mode),
            ("ws", rest) => c.workspace_command(rest),
            ("album", rest) => c.album_command(rest),
            ("rename", new_name) if !new_name.is_empty() => {
                let old_name = c.current_filename()?;
                c.state.rename_photo(&old_name, new_name)?;
                println!("Renamed {} -> {}", old_name, new_name);
                Ok(())
            }
            ("exif", "") => {
                c.show_exif()?;
                Ok(())
            }
            ("status", "") => {
                println!("{}", status_line(&c.state));
                Ok(())
            }
            _ => Err(AppError::Validation(format!(
                "Unknown console command :{} (try :help)",
                input
            ))),
        });
        Flow::Continue
    }

    fn add_workspace(&mut self, path: &str) -> Result<(), AppError> {
        let ticket = self.state.add_workspace(path)?;
        self.spawn_scan(ticket);
        Ok(())
    }

    fn workspace_command(&mut self, args: &str) -> Result<(), AppError> {
        match split_word(args) {
            ("", _) => {
                let workspaces = self.state.workspaces();
                if workspaces.is_empty() {
                    println!("No workspaces");
                }
                for path in workspaces.paths() {
                    let marker = if workspaces.active() == Some(path.as_str()) { '*' } else { ' ' };
                    println!("{} {}", marker, path);
                }
            }
            ("add", path) if !path.is_empty() => self.add_workspace(path)?,
            ("use", path) if !path.is_empty() => {
                if let Some(ticket) = self.state.switch_workspace(path) {
                    self.spawn_scan(ticket);
                }
            }
            ("rm", path) if !path.is_empty() => {
                if let Some(ticket) = self.state.remove_workspace(path) {
                    self.spawn_scan(ticket);
                }
            }
            _ => return Err(AppError::Validation("usage: :ws [add|rm|use PATH]".into())),
        }
        Ok(())
    }

    fn album_command(&mut self, args: &str) -> Result<(), AppError> {
        match split_word(args) {
            ("", _) => {
                let albums = self.state.albums();
                if albums.albums().is_empty() {
                    println!("No albums");
                }
                for album in albums.albums() {
                    let marker = if albums.viewing() == Some(album.id) { '*' } else { ' ' };
                    println!(
                        "{} {} ({} photos) {}",
                        marker,
                        album.name,
                        albums.member_count(album.id),
                        album.id
                    );
                }
            }
            ("new", name) if !name.is_empty() => {
                let id = self.state.create_album(name)?;
                println!("Created album {}", id);
            }
            ("rm", key) if !key.is_empty() => {
                let id = self.album_id(key)?;
                self.state.delete_album(id);
            }
            ("add", key) if !key.is_empty() => {
                let id = self.album_id(key)?;
                let path = self.current_path()?;
                if !self.state.add_to_album(&path, id) {
                    return Err(AppError::Validation(format!("{} cannot be added", path)));
                }
            }
            ("remove", key) if !key.is_empty() => {
                let id = self.album_id(key)?;
                let path = self.current_path()?;
                if !self.state.remove_from_album(&path, id) {
                    println!("{} was not in that album", path);
                }
            }
            ("open", key) if !key.is_empty() => {
                let id = self.album_id(key)?;
                self.state.open_album(id);
                let photos = self.state.album_detail();
                let members = self.state.albums().member_count(id);
                println!(
                    "{} of {} album photos are in this folder",
                    photos.len(),
                    members
                );
                for photo in photos {
                    println!("  {}", describe_photo(&photo));
                }
            }
            ("close", "") => self.state.close_album(),
            _ => {
                return Err(AppError::Validation(
                    "usage: :album [new NAME | rm A | add A | remove A | open A | close]".into(),
                ))
            }
        }
        Ok(())
    }

    fn album_id(&self, key: &str) -> Result<AlbumId, AppError> {
        self.state
            .albums()
            .find(key)
            .map(|a| a.id)
            .ok_or_else(|| AppError::NotFound(format!("Album {}", key)))
    }

    fn switch_view(&mut self, mode: &str) -> Result<(), AppError> {
        match mode {
            "grid" => self.state.set_view_mode(ViewMode::Grid),
            "cull" => self.state.set_view_mode(ViewMode::Cull),
            "viewer" => {
                if !self.state.open_viewer(None) {
                    return Err(AppError::Validation("No photo to view".into()));
                }
            }
            other => return Err(AppError::Validation(format!("Unknown view {}", other))),
        }
        println!("{}", status_line(&self.state));
        Ok(())
    }

    fn current_filename(&self) -> Result<String, AppError> {
        self.state
            .current_photo()
            .map(|p| p.entry.filename.clone())
            .ok_or_else(|| AppError::Validation("No photo selected".into()))
    }

    fn current_path(&self) -> Result<String, AppError> {
        self.state
            .current_photo()
            .map(|p| p.entry.path.clone())
            .ok_or_else(|| AppError::Validation("No photo selected".into()))
    }

    fn list_photos(&self) {
        let current = self.state.current_photo().map(|p| p.position);
        for photo in self.state.visible_photos() {
            let marker = if current == Some(photo.position) { '>' } else { ' ' };
            println!("{} {}", marker, describe_photo(&photo));
        }
        println!("{}", self.state.count_label());
    }

    fn list_dirs(&self, folder: Option<&str>) -> Result<(), AppError> {
        let folder = folder
            .or_else(|| self.state.store().folder())
            .ok_or_else(|| AppError::Validation("No folder is open".into()))?;
        for node in self.state.list_subfolders(folder)? {
            let more = if node.has_children { "/" } else { "" };
            println!("  {}{}", node.name, more);
        }
        Ok(())
    }

    fn show_exif(&mut self) -> Result<(), AppError> {
        let path = self.current_path()?;
        let Some(exif) = self.state.exif_for(&path) else {
            println!("No EXIF data");
            return Ok(());
        };

        let fields = [
            ("Date", exif.date_taken.clone()),
            ("Make", exif.camera_make.clone()),
            ("Model", exif.camera_model.clone()),
            ("ISO", exif.iso.map(|v| v.to_string())),
            ("Aperture", exif.aperture.clone()),
            ("Shutter", exif.shutter_speed.clone()),
            ("Focal", exif.focal_length.clone()),
            (
                "Size",
                exif.width.zip(exif.height).map(|(w, h)| format!("{}x{}", w, h)),
            ),
            (
                "GPS",
                exif.gps_lat
                    .zip(exif.gps_lon)
                    .map(|(lat, lon)| format!("{:.5}, {:.5}", lat, lon)),
            ),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                println!("  {:<9}{}", name, value);
            }
        }
        println!("  {:<9}{}", "URL", self.state.image_url(&path));
        Ok(())
    }
}

/// First word and the trimmed remainder, which is kept whole so names may contain spaces
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn one_based(input: &str) -> Result<usize, AppError> {
    match input.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(AppError::Validation(format!("{} is not a photo number", input))),
    }
}

/// `***--  red  flagged`
fn describe_meta(meta: &PhotoMeta) -> String {
    let stars = usize::from(meta.rating.min(MAX_RATING));
    let mut out = format!(
        "{}{}",
        "*".repeat(stars),
        "-".repeat(usize::from(MAX_RATING) - stars)
    );
    if !meta.label.is_none() {
        out.push_str("  ");
        out.push_str(meta.label.as_str());
    }
    if meta.flagged {
        out.push_str("  flagged");
    }
    if meta.rejected {
        out.push_str("  rejected");
    }
    out
}

fn describe_photo(photo: &PhotoView<'_>) -> String {
    format!(
        "{:>4}  {:<32} {:>9}  {}",
        photo.position + 1,
        photo.entry.filename,
        format_size(photo.entry.size),
        describe_meta(&photo.meta)
    )
}

fn describe_change(change: &MetaChange) -> String {
    let views: Vec<String> = change.views.iter().map(|v| format!("{:?}", v)).collect();
    format!(
        "{}  {}  [{}]",
        change.filename,
        describe_meta(&change.meta),
        views.join(" ")
    )
}

fn status_line(state: &AppState) -> String {
    let view = state.view();
    let mut mode = match view.mode() {
        ViewMode::Grid => "grid".to_string(),
        ViewMode::Cull => match view.cull_mode() {
            CullMode::Mark => "cull".to_string(),
            CullMode::Filter => "cull/filter".to_string(),
        },
    };
    if view.viewer_open() {
        mode.push_str("+viewer");
    }

    let filters = state.filters();
    let mut active = Vec::new();
    if filters.rating > 0 {
        active.push(format!("rating={}", filters.rating));
    }
    if !filters.label.is_none() {
        active.push(format!("label={}", filters.label));
    }
    if filters.flagged_only {
        active.push("flagged".to_string());
    }
    let filter_text = if active.is_empty() {
        String::new()
    } else {
        format!("  filter: {}", active.join(","))
    };

    let current = match state.current_photo() {
        Some(photo) => format!(
            "{}/{} {}  {}",
            photo.position + 1,
            view.len(),
            photo.entry.filename,
            describe_meta(&photo.meta)
        ),
        None => "no photo".to_string(),
    };

    format!("[{}] {}  ({}){}", mode, current, state.count_label(), filter_text)
}

/// Format file size for display
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
