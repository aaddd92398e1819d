/// Top-level screens of the dashboard, addressed by path so the
/// coordination core can record a pending destination without knowing
/// anything about the shell's routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Streams,
    History,
    Settings,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Streams, Route::History, Route::Settings];

    pub fn path(self) -> &'static str {
        match self {
            Route::Streams => "/streams",
            Route::History => "/history",
            Route::Settings => "/settings",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Streams => "Streams",
            Route::History => "History",
            Route::Settings => "Settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let p = path.trim_end_matches('/');
        Route::ALL.into_iter().find(|r| r.path() == p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for r in Route::ALL {
            assert_eq!(Route::from_path(r.path()), Some(r));
        }
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        assert_eq!(Route::from_path("/streams/"), Some(Route::Streams));
    }

    #[test]
    fn unknown_path_is_none() {
        assert_eq!(Route::from_path("/accounts"), None);
        assert_eq!(Route::from_path(""), None);
    }
}
