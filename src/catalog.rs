// StreamSync - Offline Video Downloads for Mobile
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Demo playlist shown by the app

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Display duration, e.g. "12m"
    pub duration: String,
    pub thumbnail: String,
    pub description: String,
}

impl VideoItem {
    fn new(id: &str, title: &str, url: &str, duration: &str, thumbnail: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            duration: duration.to_string(),
            thumbnail: thumbnail.to_string(),
            description: description.to_string(),
        }
    }

    /// HLS playlists need the engine; progressive files could be fetched directly
    pub fn is_hls(&self) -> bool {
        self.url.ends_with(".m3u8")
    }
}

/// The four sample videos bundled with the app
pub fn demo_catalog() -> Vec<VideoItem> {
    vec![
        VideoItem::new(
            "1",
            "Sintel",
            "https://bitmovin-a.akamaihd.net/content/sintel/hls/playlist.m3u8",
            "12m",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/images/Sintel.jpg",
            "Sintel is an independently produced short film, initiated by the Blender Foundation...",
        ),
        VideoItem::new(
            "2",
            "Big Buck Bunny",
            "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8",
            "13m",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/images/BigBuckBunny.jpg",
            "Big Buck Bunny is a short computer-animated comedy film, featuring animals of the forest...",
        ),
        VideoItem::new(
            "3",
            "For Bigger Blazes",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4",
            "2m",
            "https://storage.googleapis.com/gtv-videos-bucket/sample/images/ForBiggerBlazes.jpg",
            "For Bigger Blazes is a short film that shows off the capabilities of the Google Cloud Platform.",
        ),
        VideoItem::new(
            "4",
            "For Bigger Escape",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerEscapes.mp4",
            "1m",
            "https://storage.googleapis.com/gtv-videos-bucket/sample/images/ForBiggerEscapes.jpg",
            "For Bigger Escape is a short film that shows off the capabilities of the Google Cloud Platform.",
        ),
    ]
}

/// Look up a catalog entry by its id
pub fn find_video<'a>(catalog: &'a [VideoItem], id: &str) -> Option<&'a VideoItem> {
    catalog.iter().find(|v| v.id == id)
}
