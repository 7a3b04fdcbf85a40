//! Literal marker search for prompt and page-banner detection.

use memchr::memmem;

/// Location of a marker inside a haystack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMatch {
    /// Index of the marker in the caller's marker list.
    pub index: usize,

    /// Byte offset where the marker starts.
    pub start: usize,

    /// Byte offset just past the marker.
    pub end: usize,
}

impl MarkerMatch {
    fn shifted(self, offset: usize) -> Self {
        Self {
            index: self.index,
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Find the marker whose first occurrence comes earliest in `haystack`.
///
/// Ties (two markers starting at the same offset) go to the marker listed
/// first. Empty markers never match.
pub fn find_first_marker<M: AsRef<[u8]>>(haystack: &[u8], markers: &[M]) -> Option<MarkerMatch> {
    let mut best: Option<MarkerMatch> = None;

    for (index, marker) in markers.iter().enumerate() {
        let needle = marker.as_ref();
        if needle.is_empty() {
            continue;
        }
        if let Some(start) = memmem::find(haystack, needle) {
            if best.is_none_or(|b| start < b.start) {
                best = Some(MarkerMatch {
                    index,
                    start,
                    end: start + needle.len(),
                });
            }
        }
    }

    best
}

/// Render a marker set for logs and error messages.
pub fn describe_markers<M: AsRef<[u8]>>(markers: &[M]) -> String {
    let parts: Vec<String> = markers
        .iter()
        .map(|m| format!("{:?}", String::from_utf8_lossy(m.as_ref())))
        .collect();
    format!("[{}]", parts.join(", "))
}

/// Incremental marker search over a growing buffer.
///
/// Each call to [`next_match`](Self::next_match) only rescans the bytes that
/// could hold a match not seen before: the new data plus a `longest - 1`
/// byte overlap for markers straddling two reads. Found matches advance the
/// scanner past themselves, so repeated calls enumerate occurrences in order.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    markers: Vec<Vec<u8>>,
    longest: usize,

    /// Matches must start at or after this offset.
    floor: usize,

    /// No unseen match ends at or before this offset.
    scanned: usize,
}

impl MarkerScanner {
    /// Create a scanner for the given markers.
    pub fn new<M: AsRef<[u8]>>(markers: &[M]) -> Self {
        let markers: Vec<Vec<u8>> = markers.iter().map(|m| m.as_ref().to_vec()).collect();
        let longest = markers.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            markers,
            longest,
            floor: 0,
            scanned: 0,
        }
    }

    /// The markers this scanner looks for.
    pub fn markers(&self) -> &[Vec<u8>] {
        &self.markers
    }

    /// Find the next unseen match in `haystack`, which must only ever grow
    /// between calls.
    pub fn next_match(&mut self, haystack: &[u8]) -> Option<MarkerMatch> {
        let start = self
            .floor
            .max(self.scanned.saturating_sub(self.longest.saturating_sub(1)));
        if start >= haystack.len() {
            return None;
        }

        match find_first_marker(&haystack[start..], &self.markers) {
            Some(m) => {
                let m = m.shifted(start);
                self.floor = m.end;
                self.scanned = m.end;
                Some(m)
            }
            None => {
                self.scanned = haystack.len();
                None
            }
        }
    }

    /// Ignore everything before `offset` from now on.
    pub fn skip_to(&mut self, offset: usize) {
        self.floor = self.floor.max(offset);
        self.scanned = self.scanned.max(offset);
    }
}
