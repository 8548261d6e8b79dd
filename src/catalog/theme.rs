use color_eyre::Result;

use crate::db::KvStore;

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

impl Theme {
  pub fn as_str(&self) -> &'static str {
    match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
    }
  }

  fn toggled(self) -> Self {
    match self {
      Theme::Light => Theme::Dark,
      Theme::Dark => Theme::Light,
    }
  }
}

/// User preferences kept next to the catalog.
pub struct Preferences {
  kv: KvStore,
}

impl Preferences {
  pub fn new(kv: KvStore) -> Self {
    Self { kv }
  }

  /// Saved theme; anything but "dark" reads as light.
  pub fn theme(&self) -> Result<Theme> {
    Ok(match self.kv.get(THEME_KEY)?.as_deref() {
      Some("dark") => Theme::Dark,
      _ => Theme::Light,
    })
  }

  pub fn toggle_theme(&self) -> Result<Theme> {
    let theme = self.theme()?.toggled();
    self.kv.set(THEME_KEY, theme.as_str())?;
    Ok(theme)
  }
}
