//! Auxiliary windows opened by pages, typically third-party sign-in flows.

use mv_core::AppResult;
use mv_core::PopupId;
use mv_core::SurfaceFactory;
use mv_core::SurfaceRequest;
use mv_core::SurfaceRole;
use mv_core::WebSurface;
use mv_profile::Profile;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;
use tracing::info;

/// Delay between detecting a finished sign-in and closing its window.
pub const AUTO_CLOSE_DELAY: Duration = Duration::from_millis(1500);

const AUTH_COMPLETE_PATTERNS: [&str; 6] = [
    "oauth/authorized",
    "oauth2/authorized",
    "oauth_callback",
    "auth/callback",
    "/close",
    "success=true",
];

/// Heuristic: does `url` look like the landing page of a completed sign-in?
pub fn is_auth_complete(url: &str) -> bool {
    if url.is_empty() || url == "about:blank" {
        return false;
    }
    AUTH_COMPLETE_PATTERNS
        .iter()
        .any(|pattern| url.contains(pattern))
}

/// One open auxiliary window.
#[derive(Debug)]
pub struct Popup<S> {
    id: PopupId,
    surface: S,
    title: String,
    current_url: String,
    close_at: Option<Instant>,
}

impl<S> Popup<S> {
    pub fn id(&self) -> PopupId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn close_at(&self) -> Option<Instant> {
        self.close_at
    }
}

/// Tracks popups so they stay alive until closed and share the active profile.
#[derive(Debug)]
pub struct PopupMediator<S> {
    popups: Vec<Popup<S>>,
    next_id: u64,
}

impl<S> Default for PopupMediator<S> {
    fn default() -> Self {
        Self {
            popups: Vec::new(),
            next_id: 1,
        }
    }
}

impl<S: WebSurface> PopupMediator<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.popups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }

    pub fn popups(&self) -> impl Iterator<Item = &Popup<S>> {
        self.popups.iter()
    }

    pub fn popups_mut(&mut self) -> impl Iterator<Item = &mut Popup<S>> {
        self.popups.iter_mut()
    }

    pub fn get(&self, id: PopupId) -> Option<&Popup<S>> {
        self.popups.iter().find(|popup| popup.id == id)
    }

    /// Builds an auxiliary surface on `profile` for a page-requested window.
    pub fn open<F>(&mut self, url: &str, profile: &Profile, factory: &mut F) -> AppResult<PopupId>
    where
        F: SurfaceFactory<Surface = S>,
    {
        self.open_titled("Sign in - Pop-up", url, profile, factory)
    }

    pub fn open_titled<F>(
        &mut self,
        title: &str,
        url: &str,
        profile: &Profile,
        factory: &mut F,
    ) -> AppResult<PopupId>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let id = PopupId(self.next_id);
        self.next_id += 1;

        let surface = factory.create(&SurfaceRequest {
            role: SurfaceRole::Popup(id),
            label: title,
            url,
            profile_name: &profile.name,
            storage_path: &profile.storage_path,
        })?;

        info!(popup = %id, url, profile = %profile.name, "popup opened");
        self.popups.push(Popup {
            id,
            surface,
            title: title.to_owned(),
            current_url: url.to_owned(),
            close_at: None,
        });

        // Some flows open directly on their completion URL.
        self.on_navigated(id, url, Instant::now());
        Ok(id)
    }

    /// Records a popup navigation and arms auto-close on the first completion URL.
    ///
    /// Returns the deadline when this call armed it.
    pub fn on_navigated(&mut self, id: PopupId, url: &str, now: Instant) -> Option<Instant> {
        let popup = self.popups.iter_mut().find(|popup| popup.id == id)?;
        popup.current_url = url.to_owned();

        if popup.close_at.is_some() || !is_auth_complete(url) {
            return None;
        }

        let deadline = now + AUTO_CLOSE_DELAY;
        popup.close_at = Some(deadline);
        debug!(popup = %id, url, "sign-in complete; auto-close armed");
        Some(deadline)
    }

    /// Popups whose auto-close deadline has passed.
    pub fn due_auto_closes(&self, now: Instant) -> Vec<PopupId> {
        self.popups
            .iter()
            .filter(|popup| popup.close_at.is_some_and(|deadline| deadline <= now))
            .map(|popup| popup.id)
            .collect()
    }

    /// Earliest armed deadline, for scheduling the next wake-up.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.popups.iter().filter_map(|popup| popup.close_at).min()
    }

    /// Unregisters and releases a popup. Unknown ids are ignored.
    pub fn close(&mut self, id: PopupId) -> bool {
        let before = self.popups.len();
        self.popups.retain(|popup| popup.id != id);
        let closed = self.popups.len() != before;
        if closed {
            info!(popup = %id, "popup closed");
        }
        closed
    }

    pub fn close_all(&mut self) {
        if !self.popups.is_empty() {
            info!(count = self.popups.len(), "closing all popups");
        }
        self.popups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::AUTO_CLOSE_DELAY;
    use super::PopupMediator;
    use super::is_auth_complete;
    use mv_core::AppResult;
    use mv_core::PopupId;
    use mv_core::SurfaceRole;
    use mv_core::testing::RecordingFactory;
    use mv_core::testing::RecordingSurface;
    use mv_profile::Profile;
    use std::path::PathBuf;
    use std::time::Duration;
    use std::time::Instant;

    fn profile(name: &str) -> Profile {
        Profile {
            name: name.to_owned(),
            storage_path: PathBuf::from(format!("/var/empty/.multi_vibe_chat_profile_{name}")),
            is_default: name == "default",
        }
    }

    fn open_one(
        mediator: &mut PopupMediator<RecordingSurface>,
        factory: &mut RecordingFactory,
        url: &str,
    ) -> AppResult<PopupId> {
        mediator.open(url, &profile("work"), factory)
    }

    #[test]
    fn auth_patterns_match() {
        assert!(is_auth_complete("https://x.com/i/oauth2/authorized?code=1"));
        assert!(is_auth_complete("https://github.com/login/oauth/authorized"));
        assert!(is_auth_complete("https://app.example/oauth_callback#t"));
        assert!(is_auth_complete("https://accounts.example/auth/callback"));
        assert!(is_auth_complete("https://accounts.example/close"));
        assert!(is_auth_complete("https://login.example/done?success=true"));
    }

    #[test]
    fn non_auth_urls_do_not_match() {
        assert!(!is_auth_complete(""));
        assert!(!is_auth_complete("about:blank"));
        assert!(!is_auth_complete("https://accounts.google.com/signin/v2"));
        assert!(!is_auth_complete("https://example.com/?success=false"));
    }

    #[test]
    fn popup_shares_active_profile() -> AppResult<()> {
        let mut factory = RecordingFactory::default();
        let mut mediator = PopupMediator::new();
        let id = open_one(&mut mediator, &mut factory, "https://accounts.google.com/")?;

        let popup = mediator.get(id);
        assert!(popup.is_some());
        if let Some(popup) = popup {
            assert_eq!(popup.surface().profile_name, "work");
            assert_eq!(popup.surface().role, SurfaceRole::Popup(id));
            assert_eq!(popup.close_at(), None);
        }
        Ok(())
    }

    #[test]
    fn auto_close_armed_once_after_delay() -> AppResult<()> {
        let mut factory = RecordingFactory::default();
        let mut mediator = PopupMediator::new();
        let id = open_one(&mut mediator, &mut factory, "https://accounts.google.com/")?;
        let now = Instant::now();

        assert_eq!(mediator.on_navigated(id, "https://accounts.google.com/next", now), None);
        let deadline = mediator.on_navigated(id, "https://claude.ai/auth/callback", now);
        assert_eq!(deadline, Some(now + AUTO_CLOSE_DELAY));
        // A later match does not push the deadline out.
        let later = now + Duration::from_millis(400);
        assert_eq!(mediator.on_navigated(id, "https://claude.ai/close", later), None);
        assert_eq!(mediator.next_deadline(), Some(now + AUTO_CLOSE_DELAY));

        assert!(mediator.due_auto_closes(now + Duration::from_millis(1499)).is_empty());
        assert_eq!(mediator.due_auto_closes(now + AUTO_CLOSE_DELAY), vec![id]);
        assert!(mediator.close(id));
        assert!(mediator.is_empty());
        assert_eq!(mediator.next_deadline(), None);
        Ok(())
    }

    #[test]
    fn manual_close_before_timer_is_harmless() -> AppResult<()> {
        let mut factory = RecordingFactory::default();
        let mut mediator = PopupMediator::new();
        let id = open_one(&mut mediator, &mut factory, "https://accounts.google.com/")?;
        mediator.on_navigated(id, "https://x.com/oauth/authorized", Instant::now());

        assert!(mediator.close(id));
        assert!(!mediator.close(id));
        assert!(mediator.due_auto_closes(Instant::now() + AUTO_CLOSE_DELAY).is_empty());
        assert_eq!(mediator.on_navigated(id, "https://x.com/close", Instant::now()), None);
        Ok(())
    }

    #[test]
    fn popup_opened_on_completion_url_arms_immediately() -> AppResult<()> {
        let mut factory = RecordingFactory::default();
        let mut mediator = PopupMediator::new();
        let id = open_one(&mut mediator, &mut factory, "https://site.example/close")?;
        assert!(mediator.get(id).is_some_and(|popup| popup.close_at().is_some()));
        Ok(())
    }

    #[test]
    fn close_all_drops_everything() -> AppResult<()> {
        let mut factory = RecordingFactory::default();
        let mut mediator = PopupMediator::new();
        let first = open_one(&mut mediator, &mut factory, "https://a.example/")?;
        let second = open_one(&mut mediator, &mut factory, "https://b.example/")?;
        assert_ne!(first, second);
        assert_eq!(mediator.len(), 2);

        mediator.close_all();
        assert!(mediator.is_empty());
        Ok(())
    }

    #[test]
    fn factory_failure_leaves_no_entry() {
        let mut factory = RecordingFactory {
            fail_labels: vec!["Sign in - Pop-up".to_owned()],
            ..RecordingFactory::default()
        };
        let mut mediator = PopupMediator::new();
        assert!(open_one(&mut mediator, &mut factory, "https://a.example/").is_err());
        assert!(mediator.is_empty());
    }
}
