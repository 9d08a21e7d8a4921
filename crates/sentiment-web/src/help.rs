//! Canned help panels shown in the results region

use maud::{Markup, html};

/// Column headers the uploaded spreadsheet is expected to carry
pub const EXPECTED_COLUMNS: [&str; 10] = [
    "Name",
    "Handle",
    "Retweets",
    "Likes",
    "Comments",
    "Views",
    "Post Body",
    "Timestamp",
    "Interacciones y Audiencia",
    "Periodo",
];

/// Help panel selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HelpTopic {
    /// Introduction with the expected file layout
    #[default]
    GettingStarted,
    /// Usage recommendations
    Tips,
    /// Common problems
    Troubleshooting,
}

impl HelpTopic {
    /// All topics, in footer link order
    pub const ALL: [Self; 3] = [Self::GettingStarted, Self::Tips, Self::Troubleshooting];

    /// URL segment
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::GettingStarted => "getting-started",
            Self::Tips => "tips",
            Self::Troubleshooting => "troubleshooting",
        }
    }

    /// Parse a URL segment
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.slug() == slug)
    }

    /// Footer link text
    #[must_use]
    pub const fn link_text(self) -> &'static str {
        match self {
            Self::GettingStarted => "¿Como empezar?",
            Self::Tips => "Recomendaciones",
            Self::Troubleshooting => "Ayuda",
        }
    }

    /// Panel content
    #[must_use]
    pub fn render(self) -> Markup {
        match self {
            Self::GettingStarted => getting_started(),
            Self::Tips => tips(),
            Self::Troubleshooting => troubleshooting(),
        }
    }
}

fn getting_started() -> Markup {
    html! {
        h2 { "¿Como empezar?" }
        p {
            "La plataforma de análisis de sentimiento procesa archivos .csv o .xlsx que \
             contengan publicaciones de redes sociales e identifica el sentimiento de cada \
             entrada como positivo, neutro o negativo. El archivo debe tener una estructura \
             específica, siendo la columna \"Post Body\" la principal fuente de análisis. \
             Una vez cargado, el sistema devuelve un panel visual con gráficos de \
             distribución, evolución mensual y las cuentas con más interacciones."
        }
        table class="example-table" {
            tr {
                @for column in EXPECTED_COLUMNS {
                    th { (column) }
                }
            }
            tr {
                @for _ in EXPECTED_COLUMNS {
                    td {}
                }
            }
        }
        div class="note" {
            span { "⚠️" }
            span {
                "Nota: Aunque todas las columnas deben estar presentes, solo \"Post Body\" es \
                 usada para el análisis de sentimiento."
                br;
                "Las demás columnas son utilizadas para enriquecer el dashboard."
            }
        }
    }
}

fn tips() -> Markup {
    html! {
        h2 { "Recomendaciones" }
        p {
            "Asegúrate de que tu archivo esté limpio y estructurado de acuerdo al formato \
             requerido. Evita textos de más de 280 caracteres por fila, ya que pueden ser \
             truncados o generar predicciones menos precisas. Para analizar otro tipo de \
             texto, como reseñas o comentarios de encuestas, basta con ubicarlo en la \
             columna \"Post Body\" y dejar las demás columnas vacías o genéricas. El modelo \
             fue entrenado en español con datos reales de redes sociales, por lo que \
             funciona mejor con texto informal."
        }
    }
}

fn troubleshooting() -> Markup {
    html! {
        h2 { "Ayuda" }
        p {
            "El problema más frecuente es un archivo sin todas las columnas requeridas o \
             con encabezados modificados, especialmente \"Post Body\". Las filas con esa \
             celda vacía se ignoran. Si el archivo supera el tamaño permitido (usualmente \
             10MB), divídelo en partes más pequeñas. El análisis corre en un servidor \
             especializado y puede tardar algunos segundos según el tamaño del archivo. \
             Ante cualquier inconveniente, revisa los nombres de las columnas y confirma \
             que el archivo es .csv o .xlsx."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slug_roundtrip() {
        for topic in HelpTopic::ALL {
            assert_eq!(HelpTopic::from_slug(topic.slug()), Some(topic));
        }
        assert_eq!(HelpTopic::from_slug("faq"), None);
    }

    #[test]
    fn test_getting_started_lists_expected_columns() {
        let html = HelpTopic::GettingStarted.render().into_string();

        assert!(html.contains(r#"<table class="example-table">"#));
        for column in EXPECTED_COLUMNS {
            assert!(html.contains(&format!("<th>{column}</th>")));
        }
        assert_eq!(html.matches("<td></td>").count(), EXPECTED_COLUMNS.len());
    }

    #[test]
    fn test_panels_have_headings() {
        assert!(HelpTopic::Tips.render().into_string().starts_with("<h2>Recomendaciones</h2>"));
        assert!(
            HelpTopic::Troubleshooting
                .render()
                .into_string()
                .starts_with("<h2>Ayuda</h2>")
        );
    }
}
