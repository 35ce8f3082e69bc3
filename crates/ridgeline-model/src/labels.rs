use crate::activity::Difficulty;
use crate::locale::Locale;

/// Interface strings that are part of the templates, not of the content.
#[derive(Debug)]
pub struct UiLabels {
    pub nav_home: &'static str,
    pub nav_activities: &'static str,
    pub nav_about: &'static str,
    pub nav_contact: &'static str,
    pub featured_heading: &'static str,
    pub activities_heading: &'static str,
    pub view_details: &'static str,
    pub duration: &'static str,
    pub difficulty: &'static str,
    pub price: &'static str,
    pub min_age: &'static str,
    pub group_size: &'static str,
    pub highlights: &'static str,
    pub includes: &'static str,
    pub book_now: &'static str,
    pub form_name: &'static str,
    pub form_email: &'static str,
    pub form_phone: &'static str,
    pub form_activity: &'static str,
    pub form_message: &'static str,
    pub form_submit: &'static str,
    pub form_sent: &'static str,
    pub not_found: &'static str,
    pub no_activities: &'static str,
    pub language: &'static str,
    difficulties: [&'static str; 4],
}

impl UiLabels {
    #[must_use]
    pub fn difficulty_label(&self, difficulty: Difficulty) -> &'static str {
        match difficulty {
            Difficulty::Easy => self.difficulties[0],
            Difficulty::Moderate => self.difficulties[1],
            Difficulty::Challenging => self.difficulties[2],
            Difficulty::Extreme => self.difficulties[3],
        }
    }
}

static EN: UiLabels = UiLabels {
    nav_home: "Home",
    nav_activities: "Activities",
    nav_about: "About us",
    nav_contact: "Contact",
    featured_heading: "Featured adventures",
    activities_heading: "All activities",
    view_details: "View details",
    duration: "Duration",
    difficulty: "Difficulty",
    price: "Price",
    min_age: "Minimum age",
    group_size: "Max group size",
    highlights: "Highlights",
    includes: "What's included",
    book_now: "Book now",
    form_name: "Name",
    form_email: "Email",
    form_phone: "Phone",
    form_activity: "Activity",
    form_message: "Message",
    form_submit: "Send",
    form_sent: "Thanks! We will get back to you shortly.",
    not_found: "Page not found",
    no_activities: "No activities are published yet.",
    language: "Language",
    difficulties: ["Easy", "Moderate", "Challenging", "Extreme"],
};

static ES: UiLabels = UiLabels {
    nav_home: "Inicio",
    nav_activities: "Actividades",
    nav_about: "Nosotros",
    nav_contact: "Contacto",
    featured_heading: "Aventuras destacadas",
    activities_heading: "Todas las actividades",
    view_details: "Ver detalles",
    duration: "Duración",
    difficulty: "Dificultad",
    price: "Precio",
    min_age: "Edad mínima",
    group_size: "Tamaño máximo del grupo",
    highlights: "Lo más destacado",
    includes: "Qué incluye",
    book_now: "Reservar",
    form_name: "Nombre",
    form_email: "Correo electrónico",
    form_phone: "Teléfono",
    form_activity: "Actividad",
    form_message: "Mensaje",
    form_submit: "Enviar",
    form_sent: "¡Gracias! Te responderemos pronto.",
    not_found: "Página no encontrada",
    no_activities: "Aún no hay actividades publicadas.",
    language: "Idioma",
    difficulties: ["Fácil", "Moderada", "Exigente", "Extrema"],
};

/// Labels for `locale`'s language; English when there is no table for it.
#[must_use]
pub fn ui_labels(locale: &Locale) -> &'static UiLabels {
    match locale.primary() {
        "es" => &ES,
        _ => &EN,
    }
}
