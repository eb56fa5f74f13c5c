//! Application list view for the home page
//!
//! Every entry is turned into an [`EntryMarkup`] view model which renders to
//! the HTML block shown inside the `#applist` container. The rendered
//! document is kept so that single entries can be patched after a stop
//! without rebuilding the whole list.

use crate::model::ApplicationEntry;
use crate::util::{escape_html, url_path_join};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Id of the container element the list is rendered into
pub const APPLIST_ID: &str = "applist";

const VIEW_CLASSES: [&str; 2] = ["view-button", "btn-success"];
const START_CLASSES: [&str; 2] = ["start-button", "btn-primary"];
const GENERIC_ICON: [&str; 3] = ["static", "images", "generic_appicon_128.png"];

/// What a button handler did in response to a click
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// No handler is interested in this click
    Ignored,
    /// A container was requested for the entry
    Started,
    /// The entry's container was stopped
    Stopped,
    /// The browser should open this URL
    Navigate(String),
    /// The handler tried and failed; the message is for display
    Failed(String),
}

impl ClickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickOutcome::Ignored => "ignored",
            ClickOutcome::Started => "started",
            ClickOutcome::Stopped => "stopped",
            ClickOutcome::Navigate(_) => "navigate",
            ClickOutcome::Failed(_) => "failed",
        }
    }
}

/// Click handlers supplied by the composing application
///
/// Both methods default to doing nothing, so an implementation only needs to
/// override the buttons it cares about.
#[async_trait]
pub trait ButtonHandlers: Send + Sync {
    /// The start/view button of entry `index` was clicked
    async fn x_button_clicked(&self, _index: usize, _entry: &ApplicationEntry) -> ClickOutcome {
        ClickOutcome::Ignored
    }

    /// The stop button of entry `index` was clicked
    async fn y_button_clicked(&self, _index: usize, _entry: &ApplicationEntry) -> ClickOutcome {
        ClickOutcome::Ignored
    }
}

/// Handlers that ignore every click
pub struct NoopHandlers;

impl ButtonHandlers for NoopHandlers {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    /// `bnx_<index>`: start or view
    X,
    /// `bny_<index>`: stop
    Y,
}

impl ButtonKind {
    pub fn element_id(&self, index: usize) -> String {
        match self {
            ButtonKind::X => format!("bnx_{index}"),
            ButtonKind::Y => format!("bny_{index}"),
        }
    }
}

/// Visibility of the stop button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopVisibility {
    Visible,
    /// Takes up space but is not shown (`visibility: hidden`)
    Hidden,
    /// Removed from the layout (`display: none`)
    Collapsed,
}

impl StopVisibility {
    fn style_attr(&self) -> &'static str {
        match self {
            StopVisibility::Visible => "",
            StopVisibility::Hidden => r#" style="visibility: hidden;""#,
            StopVisibility::Collapsed => r#" style="display: none;""#,
        }
    }

    pub fn is_shown(&self) -> bool {
        matches!(self, StopVisibility::Visible)
    }
}

/// The start/view button of one entry
#[derive(Debug, Clone, PartialEq)]
pub struct ActionButton {
    pub classes: Vec<String>,
    pub text: String,
}

impl ActionButton {
    fn remove_classes(&mut self, classes: &[&str]) {
        self.classes.retain(|c| !classes.contains(&c.as_str()));
    }

    fn add_classes(&mut self, classes: &[&str]) {
        for class in classes {
            if !self.classes.iter().any(|c| c == class) {
                self.classes.push(class.to_string());
            }
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// View model for one rendered application entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMarkup {
    pub index: usize,
    pub icon_src: String,
    pub name: String,
    pub mounts: Vec<String>,
    pub action: ActionButton,
    pub stop: StopVisibility,
}

impl EntryMarkup {
    pub fn new(index: usize, info: &ApplicationEntry, base_url: &str) -> Self {
        let image = &info.image;

        let icon_src = if image.icon_128.is_empty() {
            let mut pieces = vec![base_url];
            pieces.extend(GENERIC_ICON);
            url_path_join(&pieces)
        } else {
            format!("data:image/png;base64,{}", image.icon_128)
        };

        let policy = &image.policy;
        let mut mounts = Vec::new();
        if policy.allow_home {
            mounts.push("Workspace".to_string());
        }
        if let Some((source, target, mode)) = policy.volume() {
            mounts.push(format!(
                "{} &#x2192; {} ({})",
                escape_html(source),
                escape_html(target),
                escape_html(mode)
            ));
        }

        let (state_classes, text, stop) = if info.is_running() {
            (VIEW_CLASSES, " View", StopVisibility::Visible)
        } else {
            (START_CLASSES, " Start", StopVisibility::Hidden)
        };
        let mut classes: Vec<String> = state_classes.iter().map(|c| c.to_string()).collect();
        classes.extend(["btn".to_string(), "bnx".to_string()]);

        Self {
            index,
            icon_src,
            name: image.display_name().to_string(),
            mounts,
            action: ActionButton {
                classes,
                text: text.to_string(),
            },
            stop,
        }
    }

    /// Put the buttons back into the "not running" state
    pub fn reset_to_start(&mut self) {
        self.action.remove_classes(&VIEW_CLASSES);
        self.action.add_classes(&START_CLASSES);
        self.action.text = " Start".to_string();
        self.stop = StopVisibility::Collapsed;
    }

    pub fn to_html(&self) -> String {
        let index = self.index;
        let mut html = String::from(r#"<div class="row">"#);

        html.push_str(&format!(
            r#"<img src="{}" class="col-sm-2 va" />"#,
            escape_html(&self.icon_src)
        ));

        html.push_str(&format!(
            r#"<div class="col-sm-7 va"><h4>{}</h4>"#,
            escape_html(&self.name)
        ));
        if !self.mounts.is_empty() {
            html.push_str("<ul>");
            for mount in &self.mounts {
                html.push_str(&format!("<li>{mount}</li>"));
            }
            html.push_str("</ul>");
        }
        html.push_str("</div>");

        html.push_str(r#"<div class="col-sm-1 va">"#);
        html.push_str(&format!(
            r#"<button id="{}" data-index="{index}" class="{}"><i class="fa fa-spinner fa-spin" aria-hidden="true" style="display: none;"></i> <span>{}</span></button>"#,
            ButtonKind::X.element_id(index),
            self.action.classes.join(" "),
            self.action.text
        ));
        html.push_str("</div>");

        html.push_str(r#"<div class="col-sm-1 va">"#);
        html.push_str(&format!(
            r#"<button id="{}" data-index="{index}" class="stop-button btn btn-danger bny"{}><i class="fa fa-spinner fa-spin" aria-hidden="true" style="display: none"></i> Stop</button>"#,
            ButtonKind::Y.element_id(index),
            self.stop.style_attr()
        ));
        html.push_str("</div>");

        html.push_str("</div>");
        html
    }
}

/// Current contents of the `#applist` container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppListDocument {
    entries: Vec<EntryMarkup>,
}

impl AppListDocument {
    pub fn entries(&self) -> &[EntryMarkup] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&EntryMarkup> {
        self.entries.get(index)
    }

    pub fn to_html(&self) -> String {
        self.entries.iter().map(EntryMarkup::to_html).collect()
    }
}

/// A resolved click, ready to be fired without holding the view
pub struct BoundClick {
    pub kind: ButtonKind,
    pub index: usize,
    pub entry: ApplicationEntry,
    /// Render the binding was resolved against
    pub generation: u64,
    handlers: Arc<dyn ButtonHandlers>,
}

impl BoundClick {
    pub async fn fire(self) -> ClickOutcome {
        match self.kind {
            ButtonKind::X => self.handlers.x_button_clicked(self.index, &self.entry).await,
            ButtonKind::Y => self.handlers.y_button_clicked(self.index, &self.entry).await,
        }
    }
}

impl fmt::Debug for BoundClick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundClick")
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Renders a list of applications and routes button clicks to handlers
pub struct ApplicationListView {
    model: Vec<ApplicationEntry>,
    base_url: String,
    handlers: Arc<dyn ButtonHandlers>,
    document: AppListDocument,
    bindings: HashMap<String, (ButtonKind, usize)>,
    generation: u64,
}

impl ApplicationListView {
    pub fn new(
        model: Vec<ApplicationEntry>,
        base_url: impl Into<String>,
        handlers: Arc<dyn ButtonHandlers>,
    ) -> Self {
        Self {
            model,
            base_url: base_url.into(),
            handlers,
            document: AppListDocument::default(),
            bindings: HashMap::new(),
            generation: 0,
        }
    }

    pub fn model(&self) -> &[ApplicationEntry] {
        &self.model
    }

    /// Replace the snapshot; takes effect on the next [`render`](Self::render)
    pub fn set_model(&mut self, model: Vec<ApplicationEntry>) {
        self.model = model;
    }

    pub fn document(&self) -> &AppListDocument {
        &self.document
    }

    /// Bumped by every [`render`](Self::render)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rebuild the whole list and re-register the click handlers
    pub fn render(&mut self) {
        self.document.entries = self
            .model
            .iter()
            .enumerate()
            .map(|(index, info)| EntryMarkup::new(index, info, &self.base_url))
            .collect();
        self.bindings.clear();
        self.register_button_eventhandlers();
        self.generation += 1;
        debug!(
            entries = self.document.entries.len(),
            generation = self.generation,
            "Application list rendered"
        );
    }

    /// HTML snippet for a single application entry
    pub fn render_applist_entry(&self, index: usize, info: &ApplicationEntry) -> String {
        render_applist_entry(&self.base_url, index, info)
    }

    /// Revert the buttons of one entry to their "start" state.
    ///
    /// Returns false when no entry with that index is rendered.
    pub fn reset_buttons_to_start(&mut self, index: usize) -> bool {
        match self.document.entries.get_mut(index) {
            Some(entry) => {
                entry.reset_to_start();
                true
            }
            None => false,
        }
    }

    /// Record that the container of one entry is gone.
    ///
    /// Clears the entry's container in the model and resets its buttons, so
    /// the next click on the start button starts a new container. Nothing
    /// changes when the list was re-rendered since `generation`.
    pub fn mark_stopped(&mut self, index: usize, generation: u64) -> bool {
        if generation != self.generation {
            debug!(index, generation, current = self.generation, "Stale stop ignored");
            return false;
        }
        let Some(info) = self.model.get_mut(index) else {
            return false;
        };
        info.container = None;
        self.reset_buttons_to_start(index)
    }

    /// Bind every rendered start/view and stop button to the handlers
    pub fn register_button_eventhandlers(&mut self) {
        for entry in &self.document.entries {
            for kind in [ButtonKind::X, ButtonKind::Y] {
                self.bindings
                    .insert(kind.element_id(entry.index), (kind, entry.index));
            }
        }
    }

    /// Resolve a clicked element id to its handler
    pub fn binding(&self, element_id: &str) -> Option<BoundClick> {
        let &(kind, index) = self.bindings.get(element_id)?;
        let entry = self.model.get(index)?.clone();
        Some(BoundClick {
            kind,
            index,
            entry,
            generation: self.generation,
            handlers: Arc::clone(&self.handlers),
        })
    }
}

/// HTML snippet for a single application entry
pub fn render_applist_entry(base_url: &str, index: usize, info: &ApplicationEntry) -> String {
    EntryMarkup::new(index, info, base_url).to_html()
}
