use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Where a gallery record came from. Informational only; nothing
/// branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Seeded at startup from a remote URL.
    Sample,
    /// Ingested from a local file picked or dropped by the user.
    Upload,
    /// Produced by the image-generation model.
    Generated,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Upload => "upload",
            Self::Generated => "generated",
        }
    }
}

/// One gallery entry: an image plus its metadata.
///
/// Records are immutable after creation except for [`description`], which
/// the analysis flow sets once and may later replace (never clear) on a
/// regenerate. Uploaded and generated records embed their image bytes in
/// [`base64_data`]; sample records only carry remote URLs.
///
/// [`description`]: ImageRecord::description
/// [`base64_data`]: ImageRecord::base64_data
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,
    /// Displayable image reference: a data URL or a remote http(s) URL.
    pub url: String,
    /// Grid-sized reference; often identical to [`url`](ImageRecord::url).
    pub thumbnail_url: String,
    /// Short human label.
    pub title: String,
    /// AI-written description, absent until an analysis completes.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Provenance tag.
    pub origin: Origin,
    /// Bare base64 image payload (no data-URL prefix), when the bytes are
    /// embedded rather than remote.
    pub base64_data: Option<String>,
}

impl ImageRecord {
    /// Build a record that embeds its image bytes as a data URL (uploads
    /// and generations). `base64_data` is the bare payload; the display
    /// URL is assembled from it and `mime_type`.
    pub fn from_encoded(title: String, mime_type: &str, base64_data: String, origin: Origin) -> Self {
        let url = data_url(mime_type, &base64_data);
        Self {
            id: Uuid::new_v4().to_string(),
            thumbnail_url: url.clone(),
            url,
            title,
            description: None,
            created_at: Utc::now(),
            origin,
            base64_data: Some(base64_data),
        }
    }

    /// Build a sample record that references a remote image by URL.
    fn sample(id: &str, url: &str, thumbnail_url: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            thumbnail_url: thumbnail_url.to_string(),
            title: title.to_string(),
            description: None,
            created_at: Utc::now(),
            origin: Origin::Sample,
            base64_data: None,
        }
    }
}

/// Assemble a `data:<mime>;base64,<payload>` URL.
pub fn data_url(mime_type: &str, base64_payload: &str) -> String {
    format!("data:{mime_type};base64,{base64_payload}")
}

/// MIME type of a data URL, if `url` is one.
pub fn data_url_mime(url: &str) -> Option<&str> {
    url.strip_prefix("data:")?.split(';').next()
}

/// The in-memory gallery: an ordered collection of records (newest first)
/// plus a single optional selection.
///
/// All mutation happens through the methods here, which uphold the
/// invariants: ids stay unique, new records prepend, and a set selection
/// always references a record present in the collection.
/// Records are never removed; the `Vec` + id-lookup shape would support a
/// removal operation without redesign if one is ever needed.
///
/// # Example
///
/// ```rust
/// use gallery_ai::gallery::{Gallery, ImageRecord, Origin};
///
/// let mut gallery = Gallery::new();
/// let record = ImageRecord::from_encoded(
///     "red dot".to_string(),
///     "image/png",
///     "AAAA".to_string(),
///     Origin::Upload,
/// );
/// let id = record.id.clone();
/// gallery.insert_front(record);
/// gallery.select(Some(&id));
/// assert_eq!(gallery.selected().map(|r| r.title.as_str()), Some("red dot"));
/// ```
#[derive(Debug, Default)]
pub struct Gallery {
    records: Vec<ImageRecord>,
    selected: Option<String>,
}

impl Gallery {
    /// An empty gallery.
    pub fn new() -> Self {
        Self::default()
    }

    /// A gallery seeded with the four startup sample records.
    pub fn with_samples() -> Self {
        let mut gallery = Self::new();
        // Insert in reverse so sample-1 ends up at the head.
        for record in [
            ImageRecord::sample(
                "sample-4",
                "https://picsum.photos/id/54/800/800",
                "https://picsum.photos/id/54/400/400",
                "Abstract Peaks",
            ),
            ImageRecord::sample(
                "sample-3",
                "https://picsum.photos/id/28/800/1000",
                "https://picsum.photos/id/28/400/500",
                "Mountain Retreat",
            ),
            ImageRecord::sample(
                "sample-2",
                "https://picsum.photos/id/16/800/600",
                "https://picsum.photos/id/16/400/300",
                "Coastal View",
            ),
            ImageRecord::sample(
                "sample-1",
                "https://picsum.photos/id/10/800/800",
                "https://picsum.photos/id/10/400/400",
                "Misty Forests",
            ),
        ] {
            gallery.insert_front(record);
        }
        gallery
    }

    /// Prepend a record. Returns `false` (and logs) when a record with the
    /// same id is already present; the collection is left unchanged.
    pub fn insert_front(&mut self, record: ImageRecord) -> bool {
        if self.index_of(&record.id).is_some() {
            log::warn!("Ignoring insert of duplicate record id {}", record.id);
            return false;
        }
        self.records.insert(0, record);
        true
    }

    /// Set or clear the selection. Selecting an id that is not in the
    /// collection clears the selection.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = match id {
            Some(id) if self.index_of(id).is_some() => Some(id.to_string()),
            Some(id) => {
                log::debug!("Selection of unknown record id {id}; clearing");
                None
            }
            None => None,
        };
    }

    /// Move the selection one position toward the tail (older records).
    /// Returns whether it moved; a no-op at the last record or with no
    /// selection.
    pub fn next(&mut self) -> bool {
        match self.selected_index() {
            Some(i) if i + 1 < self.records.len() => {
                self.selected = Some(self.records[i + 1].id.clone());
                true
            }
            _ => false,
        }
    }

    /// Move the selection one position toward the head (newer records).
    /// Returns whether it moved; a no-op at the first record or with no
    /// selection.
    pub fn prev(&mut self) -> bool {
        match self.selected_index() {
            Some(i) if i > 0 => {
                self.selected = Some(self.records[i - 1].id.clone());
                true
            }
            _ => false,
        }
    }

    /// Whether [`next`](Gallery::next) would move.
    pub fn has_next(&self) -> bool {
        self.selected_index()
            .is_some_and(|i| i + 1 < self.records.len())
    }

    /// Whether [`prev`](Gallery::prev) would move.
    pub fn has_prev(&self) -> bool {
        self.selected_index().is_some_and(|i| i > 0)
    }

    /// Position of a record in the current order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// The currently selected record, if any.
    pub fn selected(&self) -> Option<&ImageRecord> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    /// The currently selected id, if any.
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Set or replace a record's description, the single permitted record
    /// mutation. Returns whether the record was found.
    pub fn set_description(&mut self, id: &str, text: String) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.description = Some(text);
                true
            }
            None => {
                log::warn!("Description arrived for unknown record id {id}");
                false
            }
        }
    }

    /// All records, newest first.
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn selected_index(&self) -> Option<usize> {
        self.selected.as_deref().and_then(|id| self.index_of(id))
    }
}
