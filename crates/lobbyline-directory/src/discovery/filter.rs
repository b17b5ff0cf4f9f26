use lobbyline_core::{GameStatus, Lobby, LobbyFilter, MetadataKey};

/// Password filter for the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    All,
    /// No password.
    Public,
    /// Password protected.
    Private,
}

/// Content the local client can run; lobbies for anything else are hidden
/// when set on a [`BrowseFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalContent {
    pub rom_id: String,
    pub build_version: String,
}

/// Everything the browser filters on.
///
/// `directory` is sent to the backend as exact-match predicates; the other
/// fields are checked locally against each decoded lobby.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseFilter {
    pub directory: LobbyFilter,
    pub hide_in_game: bool,
    pub hide_incompatible: Option<LocalContent>,
    pub visibility: Visibility,
}

impl BrowseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match predicate evaluated by the directory.
    pub fn require(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.directory.insert(key, value);
        self
    }

    pub fn hide_in_game(mut self, hide: bool) -> Self {
        self.hide_in_game = hide;
        self
    }

    pub fn only_compatible(mut self, rom_id: impl Into<String>, build_version: impl Into<String>) -> Self {
        self.hide_incompatible = Some(LocalContent {
            rom_id: rom_id.into(),
            build_version: build_version.into(),
        });
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Local predicates only; the directory filter has already been applied.
    pub fn accepts(&self, lobby: &Lobby) -> bool {
        if self.hide_in_game && lobby.status == GameStatus::InGame {
            return false;
        }
        if let Some(local) = &self.hide_incompatible {
            if !lobby.is_compatible_with(&local.rom_id, &local.build_version) {
                return false;
            }
        }
        match self.visibility {
            Visibility::All => true,
            Visibility::Public => !lobby.has_password(),
            Visibility::Private => lobby.has_password(),
        }
    }
}

impl From<LobbyFilter> for BrowseFilter {
    fn from(directory: LobbyFilter) -> Self {
        Self { directory, ..Self::default() }
    }
}
