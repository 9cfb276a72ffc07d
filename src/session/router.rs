use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{classifier::selector::PredictionSelection, entries::model::NutritionEntry};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Login,
    Home,
    Report,
    History,
    Stats,
    Profile,
}

impl Page {
    /// Pages reachable by plain navigation once logged in.
    pub fn is_navigable(self) -> bool {
        matches!(self, Self::Home | Self::History | Self::Stats | Self::Profile)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Transient per-session data for the image/manual entry flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scratch {
    pub pending_food: Option<String>,
    pub pending_image: Option<Bytes>,
    pub predictions: Option<PredictionSelection>,
}

impl Scratch {
    pub fn is_empty(&self) -> bool {
        self.pending_food.is_none() && self.pending_image.is_none() && self.predictions.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    LoginSucceeded(SessionUser),
    Logout,
    EntryPersisted(Box<NutritionEntry>),
    Navigate(Page),
    /// Recovery offered after an error: back to home.
    ReturnHome,
}

/// Page and user context for one interactive session.
///
/// Invariant: `user == None` implies `page == Page::Login`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    page: Page,
    user: Option<SessionUser>,
    pub scratch: Scratch,
    last_entry: Option<NutritionEntry>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn last_entry(&self) -> Option<&NutritionEntry> {
        self.last_entry.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Applies one user action. Actions not allowed from the current page
    /// leave the state unchanged.
    pub fn apply(mut self, action: Action) -> Self {
        let from = self.page;
        match action {
            Action::LoginSucceeded(user) if self.page == Page::Login => {
                self.user = Some(user);
                self.page = Page::Home;
            }
            Action::Logout => {
                self.user = None;
                self.scratch = Scratch::default();
                self.last_entry = None;
                self.page = Page::Login;
            }
            Action::EntryPersisted(entry) if self.is_authenticated() && self.page == Page::Home => {
                self.last_entry = Some(*entry);
                self.scratch = Scratch::default();
                self.page = Page::Report;
            }
            Action::Navigate(to) if self.is_authenticated() && to.is_navigable() => {
                self.page = to;
            }
            Action::ReturnHome if self.is_authenticated() => {
                self.page = Page::Home;
            }
            other => {
                debug!(page = ?from, action = kind(&other), "action ignored");
            }
        }
        self.enforce_login_gate()
    }

    fn enforce_login_gate(mut self) -> Self {
        if self.user.is_none() && self.page != Page::Login {
            self.page = Page::Login;
            self.scratch = Scratch::default();
            self.last_entry = None;
        }
        self
    }
}

fn kind(action: &Action) -> &'static str {
    match action {
        Action::LoginSucceeded(_) => "login_succeeded",
        Action::Logout => "logout",
        Action::EntryPersisted(_) => "entry_persisted",
        Action::Navigate(_) => "navigate",
        Action::ReturnHome => "return_home",
    }
}

#[cfg(test)]
mod tests {
    use time::{macros::date, OffsetDateTime};

    use super::*;
    use crate::{
        classifier::selector::{PredictionCandidate, DEFAULT_TOP_K},
        entries::model::EntrySource,
        nutrition::{NutritionFacts, PortionCategory},
    };

    fn user() -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            email: "demo@example.com".into(),
            name: "Demo".into(),
        }
    }

    fn entry(user_id: Uuid) -> NutritionEntry {
        NutritionEntry {
            id: Uuid::new_v4(),
            user_id,
            food_label: "Fried Rice".into(),
            portion: PortionCategory::Normal,
            nutrition: NutritionFacts::default(),
            notes: None,
            provenance: None,
            water_ml: 500,
            exercise_min: 0,
            log_date: date!(2024 - 01 - 01),
            prediction_confidence: None,
            source: EntrySource::Manual,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn logged_in() -> SessionState {
        SessionState::new().apply(Action::LoginSucceeded(user()))
    }

    #[test]
    fn starts_at_login() {
        let s = SessionState::new();
        assert_eq!(s.page(), Page::Login);
        assert!(!s.is_authenticated());
    }

    #[test]
    fn login_moves_to_home() {
        let s = logged_in();
        assert_eq!(s.page(), Page::Home);
        assert_eq!(s.user().map(|u| u.name.as_str()), Some("Demo"));
    }

    #[test]
    fn navigation_requires_a_user() {
        for page in [Page::Home, Page::Report, Page::History, Page::Stats, Page::Profile] {
            let s = SessionState::new().apply(Action::Navigate(page));
            assert_eq!(s.page(), Page::Login);
        }
        let s = SessionState::new().apply(Action::ReturnHome);
        assert_eq!(s.page(), Page::Login);
    }

    #[test]
    fn free_navigation_between_authenticated_pages() {
        let s = logged_in()
            .apply(Action::Navigate(Page::Stats))
            .apply(Action::Navigate(Page::History))
            .apply(Action::Navigate(Page::Profile));
        assert_eq!(s.page(), Page::Profile);
        let s = s.apply(Action::Navigate(Page::Home));
        assert_eq!(s.page(), Page::Home);
    }

    #[test]
    fn report_and_login_are_not_navigation_targets() {
        let s = logged_in().apply(Action::Navigate(Page::Report));
        assert_eq!(s.page(), Page::Home);
        let s = s.apply(Action::Navigate(Page::Login));
        assert_eq!(s.page(), Page::Home);
        assert!(s.is_authenticated());
    }

    #[test]
    fn persisted_entry_moves_home_to_report() {
        let s = logged_in();
        let uid = s.user().unwrap().id;
        let s = s.apply(Action::EntryPersisted(Box::new(entry(uid))));
        assert_eq!(s.page(), Page::Report);
        assert_eq!(s.last_entry().map(|e| e.food_label.as_str()), Some("Fried Rice"));

        let s = s.apply(Action::ReturnHome);
        assert_eq!(s.page(), Page::Home);
    }

    #[test]
    fn persisted_entry_outside_home_is_ignored() {
        let s = logged_in().apply(Action::Navigate(Page::Stats));
        let uid = s.user().unwrap().id;
        let s = s.apply(Action::EntryPersisted(Box::new(entry(uid))));
        assert_eq!(s.page(), Page::Stats);
        assert!(s.last_entry().is_none());
    }

    #[test]
    fn logout_clears_user_and_scratch() {
        let mut s = logged_in();
        s.scratch.pending_food = Some("Rendang".into());
        s.scratch.pending_image = Some(Bytes::from_static(b"jpeg"));
        s.scratch.predictions = Some(
            PredictionSelection::new(vec![PredictionCandidate::new("Rendang", 0.9)], DEFAULT_TOP_K)
                .unwrap(),
        );
        let s = s.apply(Action::Navigate(Page::History)).apply(Action::Logout);
        assert_eq!(s.page(), Page::Login);
        assert!(s.user().is_none());
        assert!(s.scratch.is_empty());
        assert!(s.last_entry().is_none());
    }

    #[test]
    fn second_login_while_authenticated_is_ignored() {
        let s = logged_in();
        let first = s.user().unwrap().id;
        let s = s.apply(Action::Navigate(Page::Stats)).apply(Action::LoginSucceeded(user()));
        assert_eq!(s.page(), Page::Stats);
        assert_eq!(s.user().unwrap().id, first);
    }

    #[test]
    fn no_action_sequence_leaves_login_without_user() {
        let actions = [
            Action::Navigate(Page::Home),
            Action::ReturnHome,
            Action::Logout,
            Action::Navigate(Page::Profile),
            Action::EntryPersisted(Box::new(entry(Uuid::new_v4()))),
        ];
        let mut s = SessionState::new();
        for a in actions {
            s = s.apply(a);
            assert!(s.is_authenticated() || s.page() == Page::Login);
        }
    }
}
