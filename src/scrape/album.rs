//! Album listing page parser

use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use super::html;
use super::models::{AlbumDescriptor, TrackDescriptor};
use crate::error::{Error, Result};

const SONG_TABLE_ID: &str = "songlist";
const TRACK_CELL_CLASS: &str = "clickable-row";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Check that `input` is an absolute http(s) URL before anything is fetched
pub fn parse_album_url(input: &str) -> Result<Url> {
    let input = input.trim();
    let invalid = |message: &str| Error::InvalidUrl {
        url: input.to_string(),
        message: message.to_string(),
    };

    let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs are supported"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("URL has no host"));
    }
    Ok(url)
}

/// Parse an album page into its title and ordered track list
///
/// Tracks come from the rows of the `songlist` table: the first linked
/// `clickable-row` cell of each row names the track and points at its
/// detail page.
/// Header and footer rows carry no such cell and are skipped.
pub fn parse_album(page: &str, source_url: &Url) -> Result<AlbumDescriptor> {
    let title = html::first_h2(page).unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

    let table = html::table_by_id(page, SONG_TABLE_ID).ok_or_else(|| {
        Error::parse(
            source_url.as_str(),
            "track list not found (not an album page, or the site layout changed)",
        )
    })?;

    let mut tracks = Vec::new();
    for row in html::rows(table) {
        let anchor = html::cells_with_class(row, TRACK_CELL_CLASS)
            .into_iter()
            .find_map(|cell| html::anchors(cell).into_iter().next());
        let Some(anchor) = anchor else {
            continue;
        };

        let detail_url = match source_url.join(&anchor.href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping track link {:?}: {}", anchor.href, e);
                continue;
            }
        };

        tracks.push(TrackDescriptor {
            index: tracks.len() + 1,
            display_name: anchor.text,
            detail_url,
            resolved_links: BTreeMap::new(),
        });
    }

    if tracks.is_empty() {
        return Err(Error::parse(source_url.as_str(), "album lists no tracks"));
    }

    debug!("Parsed album {:?} with {} tracks", title, tracks.len());
    Ok(AlbumDescriptor {
        title,
        source_url: source_url.clone(),
        tracks,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Album page shaped like the archive's listing markup
    pub(crate) fn album_page(title: &str, tracks: &[(&str, &str)]) -> String {
        let rows: String = tracks
            .iter()
            .enumerate()
            .map(|(i, (name, href))| {
                format!(
                    r#"<tr>
  <td class="playTrack"><div class="playTrack"></div></td>
  <td class="clickable-row" align="center">{n}.</td>
  <td class="clickable-row"><a href="{href}">{name}</a></td>
  <td class="clickable-row" align="right"><a href="{href}" style="font-weight:normal;">2:01</a></td>
  <td class="playlistDownloadSong"><a href="{href}"><i class="material-icons">get_app</i></a></td>
</tr>
"#,
                    n = i + 1,
                    href = href,
                    name = name
                )
            })
            .collect();

        format!(
            r#"<html><body><div id="pageContent">
<h2>{title}</h2>
<p>Number of Files: {count}</p>
<table id="songlist">
<tr id="songlist_header"><th>&nbsp;</th><th>#</th><th>Song Name</th><th>MP3</th></tr>
{rows}<tr id="songlist_footer"><th colspan="3">Total:</th></tr>
</table>
</div></body></html>"#,
            title = title,
            count = tracks.len(),
            rows = rows
        )
    }

    fn base() -> Url {
        Url::parse("https://downloads.example.com/game-soundtracks/album/test-album").unwrap()
    }

    #[test]
    fn test_parse_album_tracks_in_order() {
        let page = album_page(
            "Test &amp; Album",
            &[
                ("Opening", "/game-soundtracks/album/test-album/01%20Opening.mp3"),
                ("Battle", "/game-soundtracks/album/test-album/02%20Battle.mp3"),
                ("Ending", "/game-soundtracks/album/test-album/03%20Ending.mp3"),
            ],
        );

        let album = parse_album(&page, &base()).unwrap();
        assert_eq!(album.title, "Test & Album");
        assert_eq!(album.tracks.len(), 3);

        let indices: Vec<usize> = album.tracks.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);

        // The first clickable cell is the number column, which has no link;
        // the name comes from the first linked cell.
        assert_eq!(album.tracks[1].display_name, "Battle");
        assert_eq!(
            album.tracks[2].detail_url.as_str(),
            "https://downloads.example.com/game-soundtracks/album/test-album/03%20Ending.mp3"
        );
        assert!(album.tracks.iter().all(|t| t.resolved_links.is_empty()));
    }

    #[test]
    fn test_parse_album_url() {
        let url = parse_album_url("  https://downloads.example.com/game-soundtracks/album/x \n").unwrap();
        assert_eq!(url.path(), "/game-soundtracks/album/x");

        assert!(matches!(parse_album_url(""), Err(Error::InvalidUrl { .. })));
        assert!(matches!(parse_album_url("downloads.example.com/album"), Err(Error::InvalidUrl { .. })));
        assert!(matches!(parse_album_url("ftp://example.com/album"), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn test_missing_title_falls_back() {
        let page = r#"<table id="songlist"><tr><td class="clickable-row"><a href="/t/1.mp3">One</a></td></tr></table>"#;
        let album = parse_album(page, &base()).unwrap();
        assert_eq!(album.title, UNKNOWN_ALBUM);
        assert_eq!(album.tracks.len(), 1);
    }

    #[test]
    fn test_missing_songlist_is_parse_error() {
        let page = "<html><h2>Search results</h2><p>nothing here</p></html>";
        assert!(matches!(parse_album(page, &base()), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_empty_songlist_is_parse_error() {
        let page = album_page("Empty", &[]);
        assert!(matches!(parse_album(&page, &base()), Err(Error::Parse { .. })));
    }
}
