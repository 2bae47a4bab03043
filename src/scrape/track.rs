//! Track detail page resolution
//!
//! A detail page offers one download link per audio format. Links are
//! classified by the extension of the file they point at.

use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use super::client::PageFetcher;
use super::html;
use super::models::{AudioFormat, TrackDescriptor};
use crate::error::{Error, Result};

/// Fetch a track's detail page and collect its download links
///
/// When the page only has a player source and `preference` asks for FLAC,
/// the FLAC file next to the player's MP3 is offered too if the server has
/// it.
pub async fn resolve_track(
    fetcher: &dyn PageFetcher,
    track: &TrackDescriptor,
    preference: &[String],
) -> Result<BTreeMap<AudioFormat, Url>> {
    let page = fetcher.fetch_html(&track.detail_url).await?;
    let (mut links, source) = extract_links(&page, &track.detail_url)?;

    let wants_flac = preference
        .iter()
        .any(|f| f.eq_ignore_ascii_case(AudioFormat::Flac.as_str()));
    if source == LinkSource::Player && wants_flac && !links.contains_key(&AudioFormat::Flac) {
        if let Some(flac) = links.get(&AudioFormat::Mp3).and_then(flac_variant) {
            if fetcher.exists(&flac).await {
                debug!("Player FLAC variant found: {}", flac);
                links.insert(AudioFormat::Flac, flac);
            }
        }
    }

    debug!(
        "Track {} ({}) offers: {}",
        track.index,
        track.display_name,
        links
            .keys()
            .map(AudioFormat::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(links)
}

/// Where a detail page's links came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkSource {
    Anchors,
    Player,
}

/// Extract format -> file URL from a detail page
///
/// Anchors labelled as downloads win. Without any, every anchor pointing at
/// an audio file is considered, and as a last resort the page's `<audio>`
/// player source. The first link seen for a format is kept.
fn extract_links(
    page: &str,
    detail_url: &Url,
) -> Result<(BTreeMap<AudioFormat, Url>, LinkSource)> {
    let anchors = html::anchors(page);

    let labelled: Vec<&str> = anchors
        .iter()
        .filter(|a| a.text.to_ascii_lowercase().contains("download"))
        .map(|a| a.href.as_str())
        .collect();
    let mut links = classify(labelled, detail_url);

    if links.is_empty() {
        links = classify(anchors.iter().map(|a| a.href.as_str()), detail_url);
    }
    if !links.is_empty() {
        return Ok((links, LinkSource::Anchors));
    }

    let sources = html::audio_sources(page);
    let links = classify(sources.iter().map(String::as_str), detail_url);
    if links.is_empty() {
        return Err(Error::parse(
            detail_url.as_str(),
            "no downloadable links found",
        ));
    }

    Ok((links, LinkSource::Player))
}

/// Same file URL with the `.mp3` extension swapped for `.flac`
fn flac_variant(mp3: &Url) -> Option<Url> {
    let stem = mp3.path().strip_suffix(".mp3")?;
    let mut flac = mp3.clone();
    flac.set_path(&format!("{}.flac", stem));
    Some(flac)
}

fn classify<'a>(
    hrefs: impl IntoIterator<Item = &'a str>,
    detail_url: &Url,
) -> BTreeMap<AudioFormat, Url> {
    let mut links = BTreeMap::new();
    for href in hrefs {
        let Some(url) = normalize_file_url(detail_url, href) else {
            continue;
        };
        // Navigation links back to this very page end in .mp3 too
        if url == *detail_url {
            continue;
        }
        if let Some(format) = AudioFormat::from_url(&url) {
            links.entry(format).or_insert(url);
        }
    }
    links
}

/// Resolve an href against the page URL without double-encoding it
///
/// Hrefs on the archive are sometimes already percent-encoded (`%20`) and
/// sometimes raw. Decoding once and letting the URL parser re-encode gives
/// the same result for both.
pub fn normalize_file_url(base: &Url, href: &str) -> Option<Url> {
    // Escapes that are not UTF-8 (Latin-1 `%E9`) are left as the server sent them
    let Ok(decoded) = urlencoding::decode(href) else {
        return base.join(href).ok();
    };

    // Characters that were escaped in the href must stay part of the path
    let mut escaped = String::with_capacity(decoded.len());
    for c in decoded.chars() {
        match c {
            '#' if !href.contains('#') => escaped.push_str("%23"),
            '?' if !href.contains('?') => escaped.push_str("%3F"),
            '%' => escaped.push_str("%25"),
            _ => escaped.push(c),
        }
    }

    base.join(&escaped).ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Detail page shaped like the archive's per-track markup
    pub(crate) fn track_page(title: &str, files: &[&str]) -> String {
        let links: String = files
            .iter()
            .map(|href| {
                let ext = href.rsplit('.').next().unwrap_or("").to_ascii_uppercase();
                format!(
                    r#"<p><a href="{href}"><span class="songDownloadLink"><i class="material-icons">get_app</i>Click here to download as {ext}</span></a> (4.2 MB)</p>"#
                )
            })
            .collect();

        format!(
            r#"<html><body><div id="pageContent">
<p align="left">Album name: <b>Test Album</b><br>Song name: <b>{title}</b></p>
<audio id="audio" src="" controls></audio>
{links}
<p><a href="/game-soundtracks/album/test-album">Back to album</a></p>
</div></body></html>"#
        )
    }

    fn detail() -> Url {
        Url::parse("https://downloads.example.com/game-soundtracks/album/test-album/01%20Opening.mp3")
            .unwrap()
    }

    #[test]
    fn test_extract_download_links_by_extension() {
        let page = track_page(
            "Opening",
            &[
                "https://cdn.example.com/soundtracks/test-album/01%20Opening.mp3",
                "https://cdn.example.com/soundtracks/test-album/01%20Opening.flac",
            ],
        );

        let (links, _) = extract_links(&page, &detail()).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[&AudioFormat::Flac].as_str(),
            "https://cdn.example.com/soundtracks/test-album/01%20Opening.flac"
        );
        assert!(links.contains_key(&AudioFormat::Mp3));
    }

    #[test]
    fn test_unlabelled_links_ignore_self_reference() {
        let page = r#"
            <a href="/game-soundtracks/album/test-album/01%20Opening.mp3">Opening</a>
            <a href="https://cdn.example.com/x/01%20Opening.ogg">ogg</a>
        "#;
        let (links, source) = extract_links(page, &detail()).unwrap();
        assert_eq!(links.keys().copied().collect::<Vec<_>>(), vec![AudioFormat::Ogg]);
        assert_eq!(source, LinkSource::Anchors);
    }

    #[test]
    fn test_audio_element_fallback() {
        let page = r#"<audio id="audio" src="https://cdn.example.com/x/01%20Opening.mp3"></audio>"#;
        let (links, source) = extract_links(page, &detail()).unwrap();
        assert!(links.contains_key(&AudioFormat::Mp3));
        assert_eq!(source, LinkSource::Player);
    }

    #[test]
    fn test_no_links_is_parse_error() {
        let page = track_page("Opening", &[]);
        assert!(matches!(
            extract_links(&page, &detail()),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_normalize_does_not_double_encode() {
        let base = detail();
        let raw = normalize_file_url(&base, "https://cdn.example.com/a/01 Opening.flac").unwrap();
        let encoded =
            normalize_file_url(&base, "https://cdn.example.com/a/01%20Opening.flac").unwrap();
        assert_eq!(raw, encoded);
        assert_eq!(raw.as_str(), "https://cdn.example.com/a/01%20Opening.flac");

        let hash = normalize_file_url(&base, "https://cdn.example.com/a/No.%231.mp3").unwrap();
        assert_eq!(hash.path(), "/a/No.%231.mp3");
        assert_eq!(hash.fragment(), None);
    }

    #[test]
    fn test_normalize_keeps_non_utf8_escapes() {
        let url = normalize_file_url(&detail(), "https://cdn.example.com/a/Caf%E9.mp3").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a/Caf%E9.mp3");
    }

    #[test]
    fn test_flac_variant() {
        let mp3 = Url::parse("https://cdn.example.com/a/01%20Opening.mp3").unwrap();
        assert_eq!(
            flac_variant(&mp3).unwrap().as_str(),
            "https://cdn.example.com/a/01%20Opening.flac"
        );

        let ogg = Url::parse("https://cdn.example.com/a/01.ogg").unwrap();
        assert!(flac_variant(&ogg).is_none());
    }

    /// Serves one detail page and answers HEAD for a fixed set of URLs
    struct PlayerOnly {
        page: String,
        present: Vec<Url>,
    }

    #[async_trait::async_trait]
    impl PageFetcher for PlayerOnly {
        async fn fetch_html(&self, _url: &Url) -> Result<String> {
            Ok(self.page.clone())
        }

        async fn exists(&self, url: &Url) -> bool {
            self.present.contains(url)
        }
    }

    fn player_track() -> TrackDescriptor {
        TrackDescriptor {
            index: 1,
            display_name: "Opening".into(),
            detail_url: detail(),
            resolved_links: BTreeMap::new(),
        }
    }

    fn prefs(formats: &[&str]) -> Vec<String> {
        formats.iter().map(|f| f.to_string()).collect()
    }

    #[tokio::test]
    async fn test_player_source_offers_flac_variant_when_present() {
        let flac = Url::parse("https://cdn.example.com/x/01%20Opening.flac").unwrap();
        let fetcher = PlayerOnly {
            page: r#"<audio src="https://cdn.example.com/x/01%20Opening.mp3"></audio>"#.into(),
            present: vec![flac.clone()],
        };

        let links = resolve_track(&fetcher, &player_track(), &prefs(&["flac", "mp3"]))
            .await
            .unwrap();
        assert_eq!(links.get(&AudioFormat::Flac), Some(&flac));
        assert!(links.contains_key(&AudioFormat::Mp3));

        let links = resolve_track(&fetcher, &player_track(), &prefs(&["mp3"]))
            .await
            .unwrap();
        assert!(!links.contains_key(&AudioFormat::Flac));
    }

    #[tokio::test]
    async fn test_player_source_without_flac_on_server() {
        let fetcher = PlayerOnly {
            page: r#"<audio src="https://cdn.example.com/x/01%20Opening.mp3"></audio>"#.into(),
            present: Vec::new(),
        };

        let links = resolve_track(&fetcher, &player_track(), &prefs(&["flac", "mp3"]))
            .await
            .unwrap();
        assert_eq!(links.keys().copied().collect::<Vec<_>>(), vec![AudioFormat::Mp3]);
    }
}
