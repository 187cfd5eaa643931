//! Per-upload working state kept between browser requests.
//!
//! Each uploaded drawing lives in a [`DocumentStore`] under a random UUID
//! together with what the user has done to it so far: per-page scales,
//! post-diameter overrides and the latest report for each measured page.
//! Documents idle longer than the TTL are dropped on the next access; when
//! the store is full the least recently used document makes room.
//!
//! The map sits behind a `std::sync::Mutex`. Every method holds the lock
//! for map access only; no lock is held across an `.await`.

use crate::drawing::{Drawing, RenderedPage};
use crate::error::HekwerkError;
use crate::geometry::CanvasObject;
use crate::measure::{measure_page, MeasureOptions, PageReport};
use crate::report::ResultsTable;
use crate::scale::{PageScales, Scale};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// One uploaded drawing and the user's work on it.
#[derive(Debug)]
pub struct Session {
    pub drawing: Drawing,
    pub scales: PageScales,
    pub diameter_overrides: HashMap<String, f64>,
    pub reports: BTreeMap<usize, PageReport>,
    last_access: Instant,
}

impl Session {
    fn new(drawing: Drawing) -> Self {
        Self {
            drawing,
            scales: PageScales::new(),
            diameter_overrides: HashMap::new(),
            reports: BTreeMap::new(),
            last_access: Instant::now(),
        }
    }

    /// 0-based index of a 1-based page number, validated against the drawing.
    fn page_index(&self, page: usize) -> Result<usize, HekwerkError> {
        self.drawing.page(page).map(|p| p.number - 1)
    }
}

/// Summary returned after an upload.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    #[serde(flatten)]
    pub drawing: Drawing,
}

/// A calibration request for one page.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ScaleInput {
    #[serde(default)]
    pub objects: Vec<CanvasObject>,
    pub real_length_mm: f64,
}

/// A measurement request for one page.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MeasureInput {
    /// Recalibrate before measuring; the stored scale is used otherwise.
    #[serde(default)]
    pub scale: Option<ScaleInput>,
    #[serde(default)]
    pub panels: Vec<CanvasObject>,
    #[serde(default)]
    pub posts: Vec<CanvasObject>,
    pub coat_both_sides: Option<bool>,
    pub default_post_diameter_mm: Option<f64>,
    /// Merged into the document's stored overrides.
    #[serde(default)]
    pub diameter_overrides: HashMap<String, f64>,
}

/// In-memory documents keyed by id.
#[derive(Debug)]
pub struct DocumentStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    ttl: Duration,
    capacity: usize,
}

impl DocumentStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        // A panic while holding the lock leaves plain data behind; keep serving.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a freshly loaded drawing and return its summary.
    pub fn insert(&self, drawing: Drawing) -> SessionSummary {
        let id = Uuid::new_v4();
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions);
        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_access)
                .map(|(id, _)| *id);
            match oldest {
                Some(old) => {
                    info!("Session store full, evicting {}", old);
                    sessions.remove(&old);
                }
                None => break,
            }
        }
        let summary = SessionSummary {
            id,
            drawing: drawing.clone(),
        };
        sessions.insert(id, Session::new(drawing));
        debug!("Stored document {} ({} live)", id, sessions.len());
        summary
    }

    /// Run `f` on a live session, refreshing its idle timer.
    pub fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<T, HekwerkError>,
    ) -> Result<T, HekwerkError> {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions);
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| HekwerkError::DocumentNotFound { id: id.to_string() })?;
        session.last_access = Instant::now();
        f(session)
    }

    /// The rendered page, for serving its PNG.
    pub fn page(&self, id: Uuid, page: usize) -> Result<RenderedPage, HekwerkError> {
        self.with_session(id, |s| s.drawing.page(page).cloned())
    }

    /// Calibrate a page and remember the scale.
    ///
    /// Without a usable line or a positive real length the page keeps its
    /// stored scale; only a page that has none is an error.
    pub fn calibrate(&self, id: Uuid, page: usize, input: &ScaleInput) -> Result<Scale, HekwerkError> {
        self.with_session(id, |s| {
            let idx = s.page_index(page)?;
            s.scales
                .resolve(idx, &input.objects, input.real_length_mm)
                .ok_or_else(|| {
                    HekwerkError::InvalidScale(format!(
                        "page {page} is not calibrated: draw a line along a known dimension \
                         and enter its real length (> 0 mm, got {})",
                        input.real_length_mm
                    ))
                })
        })
    }

    /// Measure a page with the stored (or freshly calibrated) scale and keep
    /// the report for export.
    pub fn measure(
        &self,
        id: Uuid,
        page: usize,
        input: &MeasureInput,
        defaults: &MeasureOptions,
    ) -> Result<PageReport, HekwerkError> {
        self.with_session(id, |s| {
            let idx = s.page_index(page)?;
            let scale = match &input.scale {
                Some(sc) => s.scales.resolve(idx, &sc.objects, sc.real_length_mm),
                None => s.scales.get(idx),
            };

            s.diameter_overrides.extend(
                input
                    .diameter_overrides
                    .iter()
                    .map(|(k, v)| (k.clone(), *v)),
            );
            let options = MeasureOptions {
                coat_both_sides: input.coat_both_sides.unwrap_or(defaults.coat_both_sides),
                default_post_diameter_mm: input
                    .default_post_diameter_mm
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .unwrap_or(defaults.default_post_diameter_mm),
                diameter_overrides: s.diameter_overrides.clone(),
            };

            let mut report = measure_page(idx, scale, &input.panels, &input.posts, &options);
            if let Some(sc) = &input.scale {
                report.skipped.extend(crate::scale::ignored_objects(&sc.objects));
            }
            s.reports.insert(idx, report.clone());
            Ok(report)
        })
    }

    /// All stored page reports as one table, in page order.
    pub fn results(&self, id: Uuid) -> Result<ResultsTable, HekwerkError> {
        self.with_session(id, |s| Ok(ResultsTable::from_reports(s.reports.values())))
    }

    /// Drop a document. Returns whether it existed.
    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions);
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, sessions: &mut HashMap<Uuid, Session>) {
        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_access.elapsed() < ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Expired {} idle documents", evicted);
        }
    }
}
