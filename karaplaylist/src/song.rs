//! SongRequest : une demande de chanson dans la file karaoké

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Liens acceptés : YouTube (domaine sensible à la casse), avec ou sans schéma/`www.`
static LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+").expect("static link pattern")
});

/// Préfixes suivis directement de l'identifiant de la vidéo
const ID_PREFIXES: [&str; 3] = ["youtu.be/", "youtube.com/shorts/", "youtube.com/live/"];
const EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// Une entrée de la file karaoké.
///
/// L'égalité est structurelle (les quatre champs) : c'est elle qui sert à
/// retrouver la sélection courante dans la playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct SongRequest {
    /// Personne qui chante
    pub person: String,
    /// Titre de la chanson
    pub name: String,
    /// Auteur / interprète original
    pub author: String,
    /// Lien vers la vidéo
    pub link: String,
}

impl SongRequest {
    pub fn new(
        person: impl Into<String>,
        name: impl Into<String>,
        author: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            person: person.into(),
            name: name.into(),
            author: author.into(),
            link: link.into(),
        }
    }

    /// Vérifie que le lien est une URL vidéo reconnue
    pub fn validate(&self) -> Result<()> {
        if is_valid_link(&self.link) {
            Ok(())
        } else {
            Err(Error::InvalidLink(self.link.clone()))
        }
    }

    /// URL intégrable prête à être diffusée aux écrans
    pub fn embed_url(&self, params: &str) -> String {
        canonicalize_link(&self.link, params)
    }
}

impl fmt::Display for SongRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Singer: {} | \"{}\" by {} | Link: {}",
            self.person, self.name, self.author, self.link
        )
    }
}

/// Teste un lien contre le motif des plateformes vidéo reconnues
pub fn is_valid_link(link: &str) -> bool {
    LINK_PATTERN.is_match(link)
}

/// Transforme un lien stocké en URL `embed/` directement lisible.
///
/// - `watch?v=` devient `embed/`
/// - tout ce qui suit le premier `&` est supprimé
/// - les liens `youtu.be/<id>`, `/shorts/<id>` et `/live/<id>` deviennent
///   `https://www.youtube.com/embed/<id>` (query d'origine supprimée)
/// - `params` est ajouté en query string (jointure `?` ou `&` selon le cas)
pub fn canonicalize_link(link: &str, params: &str) -> String {
    let mut url = link.replace("watch?v=", "embed/");
    if let Some(pos) = url.find('&') {
        url.truncate(pos);
    }

    if let Some((pos, prefix)) = ID_PREFIXES
        .iter()
        .find_map(|prefix| url.find(prefix).map(|pos| (pos, prefix)))
    {
        let id = &url[pos + prefix.len()..];
        let id = id.split(['?', '#']).next().unwrap_or_default();
        url = format!("{}{}", EMBED_BASE, id);
    }

    let params = params.trim_start_matches(['?', '&']);
    if params.is_empty() {
        return url;
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, params)
}
