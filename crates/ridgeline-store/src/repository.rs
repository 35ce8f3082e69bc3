use crate::backend::{ContentStore, WriteOutcome};
use crate::document::Document;
use crate::error::StoreError;
use ridgeline_model::{
    Activity, Collection, ContentDocument, Inquiry, Locale, Page, PageKind, Settings,
    SettingsSection, Slug,
};

/// Typed access to the content collections.
pub struct ContentRepository<S> {
    store: S,
}

impl<S: ContentStore> ContentRepository<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn list_typed<T: ContentDocument>(&self) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        for doc in self.store.list(T::COLLECTION)? {
            let id = doc.id.clone();
            match doc.into_typed::<T>() {
                Ok(value) => out.push(value),
                Err(e) => {
                    tracing::warn!(collection = %T::COLLECTION, id = %id, error = %e, "skipping undecodable document");
                }
            }
        }
        Ok(out)
    }

    fn get_typed<T: ContentDocument>(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, id)?
            .map(Document::into_typed)
            .transpose()
    }

    fn save_typed<T: ContentDocument>(&self, value: &T) -> Result<WriteOutcome, StoreError> {
        let doc = Document::from_typed(value)?;
        self.store.put(&doc)
    }

    /// All activities, ordered by `sort_order` then slug.
    pub fn activities(&self) -> Result<Vec<Activity>, StoreError> {
        let mut all: Vec<Activity> = self.list_typed()?;
        all.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.slug.cmp(&b.slug)));
        Ok(all)
    }

    pub fn published_activities(&self) -> Result<Vec<Activity>, StoreError> {
        Ok(self
            .activities()?
            .into_iter()
            .filter(|a| a.published)
            .collect())
    }

    pub fn featured_activities(&self) -> Result<Vec<Activity>, StoreError> {
        Ok(self
            .published_activities()?
            .into_iter()
            .filter(|a| a.featured)
            .collect())
    }

    pub fn activity(&self, slug: &Slug) -> Result<Option<Activity>, StoreError> {
        self.get_typed(slug.as_str())
    }

    pub fn save_activity(&self, activity: &Activity) -> Result<WriteOutcome, StoreError> {
        self.save_typed(activity)
    }

    pub fn delete_activity(&self, slug: &Slug) -> Result<bool, StoreError> {
        self.store.delete(Collection::Activities, slug.as_str())
    }

    pub fn page(&self, kind: PageKind, locale: &Locale) -> Result<Option<Page>, StoreError> {
        self.get_typed(&Page::id_for(kind, locale))
    }

    /// The page in `locale`, else the same page in `default`.
    pub fn page_or_default(
        &self,
        kind: PageKind,
        locale: &Locale,
        default: &Locale,
    ) -> Result<Option<Page>, StoreError> {
        match self.page(kind, locale)? {
            Some(page) => Ok(Some(page)),
            None if locale != default => self.page(kind, default),
            None => Ok(None),
        }
    }

    /// Every stored page, ordered by id.
    pub fn pages(&self) -> Result<Vec<Page>, StoreError> {
        self.list_typed()
    }

    pub fn save_page(&self, page: &Page) -> Result<WriteOutcome, StoreError> {
        self.save_typed(page)
    }

    pub fn delete_page(&self, kind: PageKind, locale: &Locale) -> Result<bool, StoreError> {
        self.store
            .delete(Collection::Pages, &Page::id_for(kind, locale))
    }

    /// Stored settings for `section`, or an empty section.
    pub fn settings(&self, section: SettingsSection) -> Result<Settings, StoreError> {
        Ok(self
            .get_typed(section.as_str())?
            .unwrap_or_else(|| Settings::empty(section)))
    }

    pub fn all_settings(&self) -> Result<Vec<Settings>, StoreError> {
        SettingsSection::ALL
            .into_iter()
            .map(|section| self.settings(section))
            .collect()
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<WriteOutcome, StoreError> {
        self.save_typed(settings)
    }

    /// Newest first.
    pub fn inquiries(&self) -> Result<Vec<Inquiry>, StoreError> {
        let mut all: Vec<Inquiry> = self.list_typed()?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(all)
    }

    pub fn save_inquiry(&self, inquiry: &Inquiry) -> Result<WriteOutcome, StoreError> {
        self.save_typed(inquiry)
    }
}
