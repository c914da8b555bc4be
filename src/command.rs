//! The search command as the host bot sees it.
//!
//! An invocation is routed through `ROUTES`, an ordered table of guards.
//! The first guard that matches picks the action, so a row's position is
//! its priority. Admin rows check authority inside their action.

use crate::engine::{is_video, ImageResult, SearchEngine};
use crate::error::AppError;
use crate::group_config::{GroupConfig, GroupConfigPatch, GroupConfigStore};
use crate::tags::{self, add_tags, parse_tags, remove_tags};
use clap::{CommandFactory, Parser};
use thiserror::Error;

/// Minimum authority for settings changes.
pub const ADMIN_AUTHORITY: u8 = 2;

pub const HELP: &str = "\
Random image search
  <tags>              search with comma-separated tags, e.g. `cute, solo`
  --status            show this group's settings
  --tags              list this group's custom tags
  --on / --off        enable or disable search here (admin)
  --onglobal          merge the global tags into searches (admin)
  --offglobal         stop merging the global tags (admin)
  --add <tags>        add custom tags (admin)
  --rm <tags>         remove custom tags (admin)";

#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "search", no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct SearchArgs {
    /// Free-text search tags, exactly as typed outside any option.
    #[arg(skip)]
    pub tags: String,
    #[arg(long)]
    pub add: Option<String>,
    #[arg(long)]
    pub rm: Option<String>,
    #[arg(long = "tags")]
    pub list_tags: bool,
    #[arg(long)]
    pub on: bool,
    #[arg(long)]
    pub off: bool,
    #[arg(long)]
    pub onglobal: bool,
    #[arg(long)]
    pub offglobal: bool,
    #[arg(long)]
    pub status: bool,
}

/// A `--name` token in the raw line, with the text up to the next one.
struct OptionSegment<'a> {
    name: &'a str,
    inline_value: Option<&'a str>,
    rest: &'a str,
    /// Everything after `--name=` or `--name `, for options that take a value.
    value: &'a str,
}

/// Splits `line` at every whitespace-delimited token that starts with `--`.
/// Returns the text before the first option and the option segments.
fn split_options(line: &str) -> (&str, Vec<OptionSegment<'_>>) {
    let mut starts = Vec::new();
    let mut prev_is_space = true;
    for (i, c) in line.char_indices() {
        // A bare `--` is left in the free text.
        let is_option = line[i..].starts_with("--")
            && line[i + 2..].starts_with(|next: char| !next.is_whitespace());
        if prev_is_space && is_option {
            starts.push(i);
        }
        prev_is_space = c.is_whitespace();
    }

    let leading = starts.first().map_or(line, |&first| &line[..first]);
    let segments = starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(line.len());
            let segment = &line[start..end];
            let token_end = segment.find(char::is_whitespace).unwrap_or(segment.len());
            let (token, rest) = segment.split_at(token_end);
            let (name, inline_value) = match token.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (token, None),
            };
            let value = match inline_value {
                Some(_) => segment[name.len() + 1..].trim(),
                None => rest.trim(),
            };
            OptionSegment { name, inline_value, rest: rest.trim(), value }
        })
        .collect();
    (leading.trim(), segments)
}

fn joined(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl SearchArgs {
    /// Parses one command line. Free text and option values keep their
    /// characters as typed, so negated tags like `-grimdark` and inner
    /// spacing reach the tag parser unchanged. Text after a flag that takes
    /// no value counts as free text.
    pub fn parse_line(line: &str) -> Result<Self, clap::Error> {
        let command = Self::command();
        let takes_value = |name: &str| {
            let long = name.trim_start_matches('-');
            command
                .get_arguments()
                .find(|arg| arg.get_long() == Some(long))
                .is_some_and(|arg| arg.get_action().takes_values())
        };

        let (leading, segments) = split_options(line);
        let mut free = vec![leading];
        let mut argv = Vec::with_capacity(segments.len());
        for segment in &segments {
            if takes_value(segment.name) {
                if segment.value.is_empty() {
                    argv.push(segment.name.to_string());
                } else {
                    argv.push(format!("{}={}", segment.name, segment.value));
                }
            } else {
                match segment.inline_value {
                    Some(value) => argv.push(format!("{}={}", segment.name, value)),
                    None => argv.push(segment.name.to_string()),
                }
                free.push(segment.rest);
            }
        }

        let mut args = Self::try_parse_from(argv)?;
        args.tags = joined(&free);
        Ok(args)
    }

    /// The free-text tags, ready for `parse_tags`.
    pub fn tag_text(&self) -> &str {
        &self.tags
    }

    fn has_option(&self) -> bool {
        self.add.is_some()
            || self.rm.is_some()
            || self.list_tags
            || self.on
            || self.off
            || self.onglobal
            || self.offglobal
            || self.status
    }
}

/// One command call handed over by the host.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// `None` outside group conversations.
    pub group_id: Option<String>,
    pub authority: Option<u8>,
    pub args: String,
}

impl Invocation {
    fn is_admin(&self) -> bool {
        self.authority.unwrap_or(0) >= ADMIN_AUTHORITY
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Image { url: String, info: String },
    Video { url: String },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("This command only works in group chats.")]
    GroupOnly,
    #[error("Permission denied: only group admins can change these settings.")]
    PermissionDenied,
    #[error("Image search is not enabled in this group. Ask an admin to turn it on with --on.")]
    NotEnabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    GroupOnly,
    Help,
    Status,
    Toggle,
    NotEnabled,
    ToggleGlobal,
    EditTags,
    ListTags,
    Search,
}

/// What the guards look at.
pub struct RouteContext<'a> {
    pub invocation: &'a Invocation,
    pub args: &'a SearchArgs,
    /// Loaded only when the invocation comes from a group.
    pub group: Option<&'a GroupConfig>,
}

pub type Guard = fn(&RouteContext<'_>) -> bool;

fn outside_group(ctx: &RouteContext<'_>) -> bool {
    ctx.invocation.group_id.is_none()
}

fn nothing_asked(ctx: &RouteContext<'_>) -> bool {
    ctx.args.tags.trim().is_empty() && !ctx.args.has_option()
}

fn wants_status(ctx: &RouteContext<'_>) -> bool {
    ctx.args.status
}

fn wants_toggle(ctx: &RouteContext<'_>) -> bool {
    ctx.args.on || ctx.args.off
}

fn group_disabled(ctx: &RouteContext<'_>) -> bool {
    ctx.group.map_or(true, |g| !g.enabled)
}

fn wants_global_toggle(ctx: &RouteContext<'_>) -> bool {
    ctx.args.onglobal || ctx.args.offglobal
}

fn wants_tag_edit(ctx: &RouteContext<'_>) -> bool {
    ctx.args.add.is_some() || ctx.args.rm.is_some()
}

fn wants_tag_list(ctx: &RouteContext<'_>) -> bool {
    ctx.args.list_tags
}

fn no_search_tags(ctx: &RouteContext<'_>) -> bool {
    parse_tags(ctx.args.tag_text()).is_empty()
}

fn always(_: &RouteContext<'_>) -> bool {
    true
}

pub static ROUTES: &[(Guard, Route)] = &[
    (outside_group, Route::GroupOnly),
    (nothing_asked, Route::Help),
    (wants_status, Route::Status),
    (wants_toggle, Route::Toggle),
    (group_disabled, Route::NotEnabled),
    (wants_global_toggle, Route::ToggleGlobal),
    (wants_tag_edit, Route::EditTags),
    (wants_tag_list, Route::ListTags),
    (no_search_tags, Route::Help),
    (always, Route::Search),
];

pub fn route(ctx: &RouteContext<'_>) -> Route {
    ROUTES
        .iter()
        .find(|(guard, _)| guard(ctx))
        .map(|(_, route)| *route)
        .unwrap_or(Route::Search)
}

pub fn status_text(group: &GroupConfig) -> String {
    format!(
        "Search enabled: {}\nGlobal tags: {}\nCustom tags: {}",
        if group.enabled { "yes" } else { "no" },
        if group.use_global_tags { "on" } else { "off" },
        tags::display(&group.custom_tags),
    )
}

pub fn result_reply(result: &ImageResult) -> Reply {
    if is_video(&result.url) {
        return Reply::Video { url: result.url.clone() };
    }
    Reply::Image {
        url: result.url.clone(),
        info: format!(
            "ID: {}\nScore: {}\nTags: {}",
            result.id,
            result.score,
            tags::display(&result.tags)
        ),
    }
}

/// Runs search commands against a config store and a search engine.
pub struct CommandHandler {
    store: GroupConfigStore,
    engine: SearchEngine,
}

impl CommandHandler {
    pub fn new(store: GroupConfigStore, engine: SearchEngine) -> Self {
        Self { store, engine }
    }

    /// Every user-facing outcome comes back as a `Reply`. Only storage
    /// failures are returned as errors.
    pub async fn handle(&self, invocation: &Invocation) -> Result<Reply, AppError> {
        let args = match SearchArgs::parse_line(&invocation.args) {
            Ok(args) => args,
            Err(e) => {
                log::debug!("Could not parse arguments {:?}: {}", invocation.args, e);
                SearchArgs::default()
            }
        };

        let group = match &invocation.group_id {
            Some(group_id) => Some(self.store.get(group_id).await?),
            None => None,
        };

        let chosen = route(&RouteContext {
            invocation,
            args: &args,
            group: group.as_ref(),
        });
        log::debug!("Routing {:?} to {:?}", invocation.args, chosen);

        let group = match (chosen, group) {
            (Route::GroupOnly, _) | (_, None) => return Ok(reject(Rejection::GroupOnly)),
            (_, Some(group)) => group,
        };

        match chosen {
            Route::GroupOnly => Ok(reject(Rejection::GroupOnly)),
            Route::Help => Ok(Reply::Text(HELP.to_string())),
            Route::Status => Ok(Reply::Text(status_text(&group))),
            Route::NotEnabled => Ok(reject(Rejection::NotEnabled)),
            Route::ListTags => Ok(Reply::Text(format!(
                "Custom tags: {}",
                tags::display(&group.custom_tags)
            ))),
            Route::Toggle => self.admin(invocation, || self.toggle(&group, args.on)).await,
            Route::ToggleGlobal => {
                self.admin(invocation, || self.toggle_global(&group, args.onglobal))
                    .await
            }
            Route::EditTags => self.admin(invocation, || self.edit_tags(&group, &args)).await,
            Route::Search => Ok(self.search(&group, args.tag_text()).await),
        }
    }

    async fn admin<F, Fut>(&self, invocation: &Invocation, action: F) -> Result<Reply, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Reply, AppError>>,
    {
        if !invocation.is_admin() {
            log::info!(
                "Rejected settings change in group {:?} at authority {}",
                invocation.group_id,
                invocation.authority.unwrap_or(0)
            );
            return Ok(reject(Rejection::PermissionDenied));
        }
        action().await
    }

    async fn toggle(&self, group: &GroupConfig, enable: bool) -> Result<Reply, AppError> {
        self.store
            .update(&group.group_id, GroupConfigPatch { enabled: Some(enable), ..Default::default() })
            .await?;
        log::info!("Search {} in group {}", if enable { "enabled" } else { "disabled" }, group.group_id);
        Ok(Reply::Text(if enable {
            "Image search is now enabled in this group.".to_string()
        } else {
            "Image search is now disabled in this group.".to_string()
        }))
    }

    async fn toggle_global(&self, group: &GroupConfig, use_global: bool) -> Result<Reply, AppError> {
        self.store
            .update(
                &group.group_id,
                GroupConfigPatch { use_global_tags: Some(use_global), ..Default::default() },
            )
            .await?;
        Ok(Reply::Text(if use_global {
            "Global tags will now be merged into searches.".to_string()
        } else {
            "Global tags will no longer be merged into searches.".to_string()
        }))
    }

    async fn edit_tags(&self, group: &GroupConfig, args: &SearchArgs) -> Result<Reply, AppError> {
        let mut custom = group.custom_tags.clone();
        if let Some(added) = &args.add {
            custom = add_tags(&custom, &parse_tags(added));
        }
        if let Some(removed) = &args.rm {
            custom = remove_tags(&custom, &parse_tags(removed));
        }

        self.store
            .update(
                &group.group_id,
                GroupConfigPatch { custom_tags: Some(custom.clone()), ..Default::default() },
            )
            .await?;
        Ok(Reply::Text(format!("Custom tags: {}", tags::display(&custom))))
    }

    async fn search(&self, group: &GroupConfig, tag_text: &str) -> Reply {
        match self.engine.search(group, tag_text).await {
            Ok(result) => result_reply(&result),
            Err(e) => {
                log::info!("Search in group {} failed: {}", group.group_id, e);
                Reply::Text(e.to_string())
            }
        }
    }
}

fn reject(rejection: Rejection) -> Reply {
    Reply::Text(rejection.to_string())
}
