//! Keyword rules that answer known questions straight from the datasets.
//!
//! Rules are evaluated in declaration order and the first one whose trigger
//! matches the case-folded query wins. Once a trigger matches, the rule always
//! produces an answer, even when the lookup behind it finds nothing.

use crate::data::{Course, Datasets};

pub const COURSES_HEADER: &str = "Nós oferecemos os seguintes cursos gratuitos e online:";
pub const DEVOPS_NOT_FOUND: &str = "Não encontrei informações sobre esse curso.";
pub const DATABASE_NOT_FOUND: &str = "Não temos curso de Banco de Dados para iniciantes.";
pub const AGILE_NOT_FOUND: &str = "Curso de Metodologias Ágeis não encontrado.";
pub const EMPLOYED_HEADER: &str = "Sim! Alguns alunos conseguiram emprego após os cursos:";
pub const NO_EMPLOYMENT_RECORDS: &str = "Ainda não temos registros públicos de alunos empregados.";
pub const ENROLL_ANSWER: &str = "Você pode se inscrever acessando nosso site e preenchendo o formulário de inscrição do curso desejado. 📄";
pub const CERTIFICATE_ANSWER: &str = "Sim! Todos os cursos oferecem certificado após a conclusão. 🎓";
pub const PAID_ANSWER: &str = "Não! Todos os nossos cursos são 100% gratuitos. 🙌";
pub const ONLINE_ANSWER: &str =
    "Sim, nossos cursos são totalmente online! Você pode estudar de onde estiver. 💻";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Any(&'static [&'static str]),
    All(&'static [&'static str]),
}

impl Trigger {
    pub fn matches(self, folded_query: &str) -> bool {
        match self {
            Self::Any(phrases) => phrases.iter().any(|p| folded_query.contains(p)),
            Self::All(phrases) => phrases.iter().all(|p| folded_query.contains(p)),
        }
    }
}

#[derive(Clone, Copy)]
pub enum Resolver {
    Fixed(&'static str),
    Lookup(fn(&Datasets) -> String),
}

#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub trigger: Trigger,
    pub resolver: Resolver,
}

impl Rule {
    pub fn resolve(&self, datasets: &Datasets) -> String {
        match self.resolver {
            Resolver::Fixed(answer) => answer.to_string(),
            Resolver::Lookup(lookup) => lookup(datasets),
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .finish()
    }
}

// Order matters: earlier rules shadow later ones that share vocabulary
// ("cursos oferecidos" also contains "cursos", "conseguiram emprego" contains
// "emprego", and so on).
pub const RULES: &[Rule] = &[
    Rule {
        name: "course_list",
        trigger: Trigger::Any(&["quais cursos", "cursos oferecidos"]),
        resolver: Resolver::Lookup(course_list),
    },
    Rule {
        name: "devops_duration",
        trigger: Trigger::All(&["duração", "devops"]),
        resolver: Resolver::Lookup(devops_duration),
    },
    Rule {
        name: "beginner_database",
        trigger: Trigger::All(&["banco de dados", "iniciante"]),
        resolver: Resolver::Lookup(beginner_database),
    },
    Rule {
        name: "agile_duration",
        trigger: Trigger::Any(&["metodologias ágeis"]),
        resolver: Resolver::Lookup(agile_duration),
    },
    Rule {
        name: "employment",
        trigger: Trigger::Any(&["emprego", "conseguiram emprego"]),
        resolver: Resolver::Lookup(employment),
    },
    Rule {
        name: "regions",
        trigger: Trigger::Any(&["regiões", "de onde vêm os alunos"]),
        resolver: Resolver::Lookup(regions),
    },
    Rule {
        name: "enroll",
        trigger: Trigger::Any(&["inscrever"]),
        resolver: Resolver::Fixed(ENROLL_ANSWER),
    },
    Rule {
        name: "certificate",
        trigger: Trigger::Any(&["certificado"]),
        resolver: Resolver::Fixed(CERTIFICATE_ANSWER),
    },
    Rule {
        name: "paid",
        trigger: Trigger::Any(&["pagos"]),
        resolver: Resolver::Fixed(PAID_ANSWER),
    },
    Rule {
        name: "online",
        trigger: Trigger::Any(&["online"]),
        resolver: Resolver::Fixed(ONLINE_ANSWER),
    },
];

pub fn rule_for(query: &str) -> Option<&'static Rule> {
    let folded = query.to_lowercase();
    RULES.iter().find(|rule| rule.trigger.matches(&folded))
}

/// Answers `query` from the datasets, or returns `None` so the caller can
/// defer to the model.
pub fn match_query(query: &str, datasets: &Datasets) -> Option<String> {
    rule_for(query).map(|rule| rule.resolve(datasets))
}

fn course_list(datasets: &Datasets) -> String {
    let lines = datasets
        .courses
        .records()
        .iter()
        .map(|course| format!("- {}", course.course_name))
        .collect::<Vec<_>>();
    format!("{COURSES_HEADER}\n{}", lines.join("\n"))
}

fn devops_duration(datasets: &Datasets) -> String {
    match first_course(datasets, |course| name_contains(course, "devops"))
        .and_then(|course| course.duration_weeks)
    {
        Some(weeks) => format!(
            "O curso de DevOps com AWS tem duração de {} semanas.",
            format_weeks(weeks)
        ),
        None => DEVOPS_NOT_FOUND.to_string(),
    }
}

fn beginner_database(datasets: &Datasets) -> String {
    let found = first_course(datasets, |course| {
        name_contains(course, "banco")
            && course.level.as_deref().is_some_and(|level| {
                let level = level.to_lowercase();
                level.contains("básico") || level.contains("iniciante")
            })
    });

    match found.and_then(|course| course.duration_weeks.map(|weeks| (course, weeks))) {
        Some((course, weeks)) => format!(
            "Sim! Temos o curso **{}**, com duração de {} semanas, voltado para iniciantes.",
            course.course_name,
            format_weeks(weeks)
        ),
        None => DATABASE_NOT_FOUND.to_string(),
    }
}

fn agile_duration(datasets: &Datasets) -> String {
    match first_course(datasets, |course| name_contains(course, "metodologias"))
        .and_then(|course| course.duration_weeks)
    {
        Some(weeks) => format!(
            "O curso de Metodologias Ágeis e Soft Skills tem duração de {} semanas e é para todos os níveis.",
            format_weeks(weeks)
        ),
        None => AGILE_NOT_FOUND.to_string(),
    }
}

fn employment(datasets: &Datasets) -> String {
    let lines = datasets
        .students
        .records()
        .iter()
        .filter_map(|student| {
            student
                .current_job
                .as_deref()
                .map(|job| format!("- {} trabalha como {job}", student.name))
        })
        .collect::<Vec<_>>();

    if lines.is_empty() {
        NO_EMPLOYMENT_RECORDS.to_string()
    } else {
        format!("{EMPLOYED_HEADER}\n{}", lines.join("\n"))
    }
}

fn regions(datasets: &Datasets) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for region in datasets
        .students
        .records()
        .iter()
        .filter_map(|student| student.region.as_deref())
    {
        if !seen.contains(&region) {
            seen.push(region);
        }
    }

    format!(
        "Nossos alunos vêm de diversas regiões do Brasil, como: {}.",
        seen.join(", ")
    )
}

fn first_course(datasets: &Datasets, predicate: impl Fn(&Course) -> bool) -> Option<&Course> {
    datasets.courses.records().iter().find(|course| predicate(course))
}

fn name_contains(course: &Course, needle: &str) -> bool {
    course.course_name.to_lowercase().contains(needle)
}

// Below 2^53 every whole f64 converts to i64 exactly.
const MAX_EXACT_WEEKS: f64 = 9.0e15;

fn format_weeks(weeks: f64) -> String {
    if weeks.abs() < MAX_EXACT_WEEKS && weeks.fract() == 0.0 {
        format!("{}", weeks as i64)
    } else {
        weeks.to_string()
    }
}
