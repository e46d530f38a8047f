// ABOUTME: One running wall: config, layout store, controller and playback backend.
// ABOUTME: Executes parsed commands, flushes media commands and saves the layout on exit.

use anyhow::{anyhow, bail, Result};
use std::fmt::Write as _;
use wall_control::{MediaBackend, MediaCommand, WallController};
use wall_core::{volume, Config, MovieLibrary, PlayerSlot};
use wall_layout::{LayoutStore, LayoutTree, NodeId, Orientation, StoreError};

use crate::command::{Command, HELP};

pub struct Session<B: MediaBackend> {
    config: Config,
    store: LayoutStore,
    controller: WallController,
    backend: B,
}

impl<B: MediaBackend> Session<B> {
    /// Scan the movie folder and bring up the startup layout
    pub fn open(config: Config, backend: B) -> Self {
        let library = scan_library(&config);
        let store = LayoutStore::new(&config.layout_folder);
        let tree = if config.open_last_on_startup {
            restore_last(&store, &config)
        } else {
            default_tree(&config)
        };

        let mut session = Self {
            controller: WallController::new(tree, library),
            config,
            store,
            backend,
        };
        session.flush();
        session
    }

    pub fn controller(&self) -> &WallController {
        &self.controller
    }

    /// Run one command and return the text to show the user
    pub fn execute(&mut self, command: Command) -> Result<String> {
        let output = self.dispatch(command);
        // Commands that failed halfway may still have queued media work
        self.flush();
        output
    }

    fn dispatch(&mut self, command: Command) -> Result<String> {
        let output = match command {
            Command::Show => self.render(),
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),

            Command::Split(n, orientation) => {
                let leaf = self.leaf(n)?;
                self.controller.split(leaf, orientation)?;
                self.render()
            }
            Command::Merge(n) => {
                let leaf = self.leaf(n)?;
                self.controller.merge(leaf)?;
                self.render()
            }
            Command::Swap(a, b) => {
                let (a, b) = (self.leaf(a)?, self.leaf(b)?);
                self.controller.swap(a, b)?;
                self.render()
            }
            Command::Resize(n, ratio) => {
                let leaf = self.leaf(n)?;
                let split = self
                    .controller
                    .tree()
                    .parent(leaf)
                    .ok_or_else(|| anyhow!("player {} fills the whole wall", n))?;
                let applied = self.controller.resize(split, ratio)?;
                format!("ratio {:.2}", applied)
            }
            Command::New => {
                self.switch_layout(default_tree(&self.config));
                self.render()
            }
            Command::Preset => {
                self.switch_layout(preset_tree(&self.config));
                self.render()
            }
            Command::Last => {
                let tree = self
                    .store
                    .load_last()?
                    .ok_or_else(|| anyhow!("no last layout saved"))?;
                self.switch_layout(tree);
                self.render()
            }
            Command::Open(name) => {
                match self.store.load_named(&name) {
                    Ok(tree) => self.switch_layout(tree),
                    Err(e @ (StoreError::Io(_) | StoreError::InvalidName(_))) => {
                        return Err(e.into())
                    }
                    Err(e) => {
                        tracing::warn!("Could not restore layout {:?}: {}", name, e);
                        self.switch_layout(default_tree(&self.config));
                        return Ok(format!("could not restore layout {:?}: {}", name, e));
                    }
                }
                self.render()
            }
            Command::Save(name) => {
                let path = self.store.save_named(&name, self.controller.tree())?;
                format!("saved {}", path.display())
            }
            Command::Layouts => self.store.list()?.join("\n"),
            Command::Movies => {
                let library = self.controller.library();
                let mut out = String::new();
                for (i, entry) in library.entries().iter().enumerate() {
                    let _ = writeln!(out, "{:>4}  {}", i, entry.label);
                }
                let _ = write!(out, "{} movies in {}", library.len(), library.root().display());
                out
            }

            Command::Primary(n) => {
                let leaf = self.leaf(n)?;
                self.controller.set_primary(leaf)?;
                self.render()
            }
            Command::Source(n, label) => {
                let leaf = self.leaf(n)?;
                let path = self
                    .controller
                    .library()
                    .path_for_label(&label)
                    .map(|p| p.to_path_buf())
                    .ok_or_else(|| anyhow!("no movie labelled {:?}", label))?;
                if !self.controller.set_source(leaf, path)? {
                    return Ok(format!("player {} already shows {}", n, label));
                }
                self.render()
            }
            Command::Volume(n, v) => {
                let leaf = self.leaf(n)?;
                format!("volume {:.2}", self.controller.set_volume(leaf, v)?)
            }
            Command::Speed(n, s) => {
                let leaf = self.leaf(n)?;
                format!("speed {:.2}", self.controller.set_speed(leaf, s)?)
            }
            Command::Mode(n, mode) => {
                let leaf = self.leaf(n)?;
                self.controller.set_end_mode(leaf, mode)?;
                format!("player {} on end: {}", n, mode.label())
            }
            Command::Jog(n, delta) => {
                let leaf = self.leaf(n)?;
                let position = self.controller.jog(leaf, delta)?;
                format!("player {} at {}", n, volume::format_time(position))
            }
            Command::Ended(n) => {
                let leaf = self.leaf(n)?;
                self.controller.on_video_ended(leaf)?;
                self.render()
            }

            Command::Play => {
                self.controller.play_all();
                self.render()
            }
            Command::Pause => {
                self.controller.pause_all();
                self.render()
            }
            Command::Mute => {
                self.controller.mute_all(true);
                self.render()
            }
            Command::Unmute => {
                self.controller.mute_all(false);
                self.render()
            }

            Command::Act => {
                self.require_primary()?;
                self.controller.act(None)?;
                self.render()
            }
            Command::Skip(offset) => {
                self.require_primary()?;
                self.controller.act(Some(offset))?;
                self.render()
            }
            Command::JogPrimary(forward) => {
                self.require_primary()?;
                self.controller
                    .jog_primary(forward, self.config.jog_interval_ms)?;
                self.render()
            }
            Command::Louder => {
                self.require_primary()?;
                self.controller
                    .nudge_primary_volume(true, self.config.volume_step)?;
                self.render()
            }
            Command::Quieter => {
                self.require_primary()?;
                self.controller
                    .nudge_primary_volume(false, self.config.volume_step)?;
                self.render()
            }
            Command::History(forward) => {
                self.require_primary()?;
                self.controller.primary_history(forward)?;
                self.render()
            }
        };
        Ok(output)
    }

    /// Save the layout if configured to and hand back the backend
    pub fn close(mut self) -> B {
        self.auto_save();
        for leaf in self.controller.tree().leaves() {
            if let Err(e) = self.backend.apply(leaf, &MediaCommand::Close) {
                tracing::warn!("Failed to close player {:?}: {}", leaf, e);
            }
        }
        tracing::info!("Session closed");
        self.backend
    }

    /// One line per player in layout order, primary marked with `*`
    pub fn render(&self) -> String {
        let tree = self.controller.tree();
        let library = self.controller.library();
        let rects = tree.leaf_rects();
        let mut out = String::new();
        for (i, (leaf, slot)) in tree.traverse_leaves().enumerate() {
            let marker = if self.controller.is_primary(leaf) { '*' } else { ' ' };
            let title = slot
                .source()
                .map(|p| library.label_for(p))
                .unwrap_or_else(|| "-".to_string());
            let rect = rects
                .iter()
                .find(|(id, _)| *id == leaf)
                .map(|(_, r)| format!("{:.2},{:.2} {:.2}x{:.2}", r.x, r.y, r.width, r.height))
                .unwrap_or_default();
            let _ = write!(
                out,
                "{}{:>2} {:<7} {} [{}] vol {:>3}{} x{:.2} {} @ {}",
                marker,
                i,
                format!("{:?}", slot.state()).to_lowercase(),
                self.clock(slot),
                slot.end_mode().label(),
                volume::volume_to_slider(slot.volume()),
                if slot.muted() { " muted" } else { "" },
                slot.speed(),
                title,
                rect,
            );
            if let Some(error) = slot.last_error() {
                let _ = write!(out, " !{}", error);
            }
            out.push('\n');
        }
        out.pop();
        out
    }

    fn clock(&self, slot: &PlayerSlot) -> String {
        let total = if self.config.remaining_time {
            format!("-{}", volume::format_time(slot.remaining()))
        } else {
            volume::format_time(slot.duration())
        };
        format!("{}/{}", volume::format_time(slot.position()), total)
    }

    fn leaf(&self, index: usize) -> Result<NodeId> {
        self.controller
            .tree()
            .traverse_leaves()
            .nth(index)
            .map(|(id, _)| id)
            .ok_or_else(|| anyhow!("no player {}", index))
    }

    fn require_primary(&self) -> Result<()> {
        if self.controller.primary().is_none() {
            bail!("no primary player, pick one with `primary <n>`");
        }
        Ok(())
    }

    fn switch_layout(&mut self, tree: LayoutTree) {
        self.auto_save();
        self.controller.replace_tree(tree);
    }

    fn auto_save(&self) {
        if !self.config.auto_save_layout {
            return;
        }
        match self.store.save_last(self.controller.tree()) {
            Ok(path) => tracing::debug!("Saved layout to {:?}", path),
            Err(e) => tracing::warn!("Failed to save layout: {}", e),
        }
    }

    fn flush(&mut self) {
        let failed = self.controller.flush(&mut self.backend);
        if failed > 0 {
            tracing::warn!("{} media commands failed", failed);
        }
    }
}

fn scan_library(config: &Config) -> MovieLibrary {
    match MovieLibrary::scan(&config.movie_folder, &config.movie_extensions) {
        Ok(library) => {
            tracing::info!(
                "Found {} movies in {:?}",
                library.len(),
                config.movie_folder
            );
            library
        }
        Err(e) => {
            tracing::warn!("Failed to scan movie folder: {}", e);
            MovieLibrary::default()
        }
    }
}

fn default_tree(config: &Config) -> LayoutTree {
    let mut slot = PlayerSlot::new();
    slot.set_volume(config.initial_volume());
    LayoutTree::with_slot(slot)
}

/// Two empty players split left and right
fn preset_tree(config: &Config) -> LayoutTree {
    let mut tree = default_tree(config);
    let root = tree.root();
    if let Err(e) = tree.split(root, Orientation::Horizontal) {
        tracing::warn!("Failed to build default layout: {}", e);
    }
    tree
}

fn restore_last(store: &LayoutStore, config: &Config) -> LayoutTree {
    match store.load_last() {
        Ok(Some(tree)) => {
            tracing::info!("Restored last layout with {} players", tree.leaf_count());
            tree
        }
        Ok(None) => default_tree(config),
        Err(e) => {
            tracing::warn!("Could not restore layout: {}", e);
            default_tree(config)
        }
    }
}
