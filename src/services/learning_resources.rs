//! Skill-to-resource matching against a curated table.
//!
//! Lookup order:
//! 1. exact, case-sensitive skill name
//! 2. case-insensitive substring match in either direction, first table entry wins
//! 3. generic search links for the skill
//!
//! The result is never empty.

use serde::Serialize;
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Course,
    Documentation,
    Tutorial,
    Video,
    Practice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningResource {
    pub title: String,
    pub url: String,
    pub platform: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub free: bool,
}

struct Curated {
    title: &'static str,
    url: &'static str,
    platform: &'static str,
    kind: ResourceKind,
    free: bool,
}

impl From<&Curated> for LearningResource {
    fn from(c: &Curated) -> Self {
        Self {
            title: c.title.to_string(),
            url: c.url.to_string(),
            platform: c.platform.to_string(),
            kind: c.kind,
            free: c.free,
        }
    }
}

macro_rules! curated {
    ($title:expr, $url:expr, $platform:expr, $kind:ident, $free:expr) => {
        Curated {
            title: $title,
            url: $url,
            platform: $platform,
            kind: ResourceKind::$kind,
            free: $free,
        }
    };
}

#[rustfmt::skip]
static RESOURCES: &[(&str, &[Curated])] = &[
    (
        "JavaScript",
        &[
            curated!("JavaScript Guide", "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Guide", "MDN Web Docs", Documentation, true),
            curated!("JavaScript Algorithms and Data Structures", "https://www.freecodecamp.org/learn/javascript-algorithms-and-data-structures-v8/", "freeCodeCamp", Course, true),
            curated!("The Modern JavaScript Tutorial", "https://javascript.info/", "javascript.info", Tutorial, true),
        ],
    ),
    (
        "TypeScript",
        &[
            curated!("The TypeScript Handbook", "https://www.typescriptlang.org/docs/handbook/intro.html", "TypeScript", Documentation, true),
            curated!("Understanding TypeScript", "https://www.udemy.com/course/understanding-typescript/", "Udemy", Course, false),
        ],
    ),
    (
        "Python",
        &[
            curated!("The Python Tutorial", "https://docs.python.org/3/tutorial/", "Python.org", Documentation, true),
            curated!("Python for Everybody", "https://www.coursera.org/specializations/python", "Coursera", Course, false),
            curated!("Scientific Computing with Python", "https://www.freecodecamp.org/learn/scientific-computing-with-python/", "freeCodeCamp", Course, true),
        ],
    ),
    (
        "React",
        &[
            curated!("Learn React", "https://react.dev/learn", "react.dev", Documentation, true),
            curated!("Front-End Development Libraries", "https://www.freecodecamp.org/learn/front-end-development-libraries/", "freeCodeCamp", Course, true),
        ],
    ),
    (
        "Node.js",
        &[
            curated!("Introduction to Node.js", "https://nodejs.org/en/learn/getting-started/introduction-to-nodejs", "Node.js", Documentation, true),
            curated!("Back End Development and APIs", "https://www.freecodecamp.org/learn/back-end-development-and-apis/", "freeCodeCamp", Course, true),
        ],
    ),
    (
        "SQL",
        &[
            curated!("SQLBolt Interactive Lessons", "https://sqlbolt.com/", "SQLBolt", Practice, true),
            curated!("SQL Tutorial", "https://www.w3schools.com/sql/", "W3Schools", Tutorial, true),
            curated!("Relational Database Certification", "https://www.freecodecamp.org/learn/relational-database/", "freeCodeCamp", Course, true),
        ],
    ),
    (
        "AWS",
        &[
            curated!("AWS Skill Builder", "https://skillbuilder.aws/", "Amazon Web Services", Course, true),
            curated!("AWS Certified Cloud Practitioner", "https://aws.amazon.com/certification/certified-cloud-practitioner/", "Amazon Web Services", Course, false),
        ],
    ),
    (
        "Docker",
        &[
            curated!("Docker Get Started", "https://docs.docker.com/get-started/", "Docker Docs", Documentation, true),
            curated!("Docker Tutorial for Beginners", "https://www.youtube.com/results?search_query=docker+tutorial+for+beginners", "YouTube", Video, true),
        ],
    ),
    (
        "Kubernetes",
        &[
            curated!("Kubernetes Basics", "https://kubernetes.io/docs/tutorials/kubernetes-basics/", "Kubernetes", Tutorial, true),
            curated!("Introduction to Kubernetes", "https://training.linuxfoundation.org/training/introduction-to-kubernetes/", "Linux Foundation", Course, true),
        ],
    ),
    (
        "Machine Learning",
        &[
            curated!("Machine Learning Specialization", "https://www.coursera.org/specializations/machine-learning-introduction", "Coursera", Course, false),
            curated!("Machine Learning Crash Course", "https://developers.google.com/machine-learning/crash-course", "Google", Course, true),
        ],
    ),
    (
        "Data Analysis",
        &[
            curated!("Google Data Analytics Certificate", "https://www.coursera.org/professional-certificates/google-data-analytics", "Coursera", Course, false),
            curated!("Data Analysis with Python", "https://www.freecodecamp.org/learn/data-analysis-with-python/", "freeCodeCamp", Course, true),
        ],
    ),
    (
        "Excel",
        &[
            curated!("Excel Skills for Business", "https://www.coursera.org/specializations/excel", "Coursera", Course, false),
            curated!("Excel Video Training", "https://support.microsoft.com/en-us/office/excel-video-training-9bc05390-e94c-46af-a5b3-d7c22f6990bb", "Microsoft", Video, true),
        ],
    ),
    (
        "Project Management",
        &[
            curated!("Google Project Management Certificate", "https://www.coursera.org/professional-certificates/google-project-management", "Coursera", Course, false),
            curated!("PMP Certification", "https://www.pmi.org/certifications/project-management-pmp", "PMI", Course, false),
        ],
    ),
    (
        "Agile",
        &[
            curated!("The Scrum Guide", "https://scrumguides.org/scrum-guide.html", "Scrum.org", Documentation, true),
            curated!("Agile with Atlassian Jira", "https://www.coursera.org/learn/agile-atlassian-jira", "Coursera", Course, false),
        ],
    ),
    (
        "Communication",
        &[
            curated!("Improving Communication Skills", "https://www.coursera.org/learn/wharton-communication-skills", "Coursera", Course, false),
            curated!("Communication Skills Tutorials", "https://www.youtube.com/results?search_query=workplace+communication+skills", "YouTube", Video, true),
        ],
    ),
    (
        "Leadership",
        &[
            curated!("Leading People and Teams", "https://www.coursera.org/specializations/leading-teams", "Coursera", Course, false),
            curated!("Leadership Lessons", "https://www.ted.com/topics/leadership", "TED", Video, true),
        ],
    ),
];

/// Curated resources for `skill`, or generic search links when no entry matches.
pub fn resources_for(skill: &str) -> Vec<LearningResource> {
    find_curated(skill)
        .map(|entries| entries.iter().map(LearningResource::from).collect())
        .unwrap_or_else(|| generic_resources(skill))
}

fn find_curated(skill: &str) -> Option<&'static [Curated]> {
    if let Some((_, entries)) = RESOURCES.iter().find(|(name, _)| *name == skill) {
        return Some(entries);
    }

    let needle = skill.trim().to_lowercase();
    // An empty needle would match every key
    if needle.is_empty() {
        return None;
    }

    RESOURCES
        .iter()
        .find(|(name, _)| {
            let key = name.to_lowercase();
            key.contains(&needle) || needle.contains(&key)
        })
        .map(|(_, entries)| *entries)
}

fn generic_resources(skill: &str) -> Vec<LearningResource> {
    let skill = skill.trim();
    let query: String = form_urlencoded::byte_serialize(skill.as_bytes()).collect();

    vec![
        LearningResource {
            title: format!("{skill} courses on Udemy"),
            url: format!("https://www.udemy.com/courses/search/?q={query}"),
            platform: "Udemy".to_string(),
            kind: ResourceKind::Course,
            free: false,
        },
        LearningResource {
            title: format!("{skill} courses on Coursera"),
            url: format!("https://www.coursera.org/search?query={query}"),
            platform: "Coursera".to_string(),
            kind: ResourceKind::Course,
            free: false,
        },
        LearningResource {
            title: format!("{skill} tutorials on YouTube"),
            url: format!("https://www.youtube.com/results?search_query={query}+tutorial"),
            platform: "YouTube".to_string(),
            kind: ResourceKind::Video,
            free: true,
        },
    ]
}
