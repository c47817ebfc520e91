//! Skill detection over extracted resume text.

use std::collections::HashSet;

use crate::jobs::matching::contains_term;

/// Canonical spelling first; aliases map onto it.
const KNOWN_SKILLS: &[(&str, &[&str])] = &[
    ("Rust", &["rust"]),
    ("Go", &["golang"]),
    ("Python", &["python"]),
    ("Java", &["java"]),
    ("Kotlin", &["kotlin"]),
    ("Scala", &["scala"]),
    ("C++", &["c++", "cpp"]),
    ("C#", &["c#", "csharp"]),
    (".NET", &[".net", "dotnet"]),
    ("Ruby", &["ruby"]),
    ("Rails", &["rails", "ruby on rails"]),
    ("PHP", &["php"]),
    ("Elixir", &["elixir"]),
    ("Swift", &["swift"]),
    ("JavaScript", &["javascript"]),
    ("TypeScript", &["typescript"]),
    ("Node.js", &["node.js", "nodejs"]),
    ("React", &["react", "react.js", "reactjs"]),
    ("Vue", &["vue", "vue.js", "vuejs"]),
    ("Angular", &["angular"]),
    ("Svelte", &["svelte"]),
    ("Next.js", &["next.js", "nextjs"]),
    ("HTML", &["html", "html5"]),
    ("CSS", &["css", "css3"]),
    ("Tailwind", &["tailwind", "tailwindcss"]),
    ("GraphQL", &["graphql"]),
    ("REST", &["rest api", "restful"]),
    ("gRPC", &["grpc"]),
    ("SQL", &["sql"]),
    ("PostgreSQL", &["postgresql", "postgres"]),
    ("MySQL", &["mysql"]),
    ("MongoDB", &["mongodb", "mongo"]),
    ("Redis", &["redis"]),
    ("Elasticsearch", &["elasticsearch"]),
    ("Kafka", &["kafka"]),
    ("RabbitMQ", &["rabbitmq"]),
    ("Docker", &["docker"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("Terraform", &["terraform"]),
    ("Ansible", &["ansible"]),
    ("AWS", &["aws", "amazon web services"]),
    ("GCP", &["gcp", "google cloud"]),
    ("Azure", &["azure"]),
    ("Linux", &["linux"]),
    ("Git", &["git"]),
    ("CI/CD", &["ci/cd", "continuous integration"]),
    ("Machine Learning", &["machine learning"]),
    ("PyTorch", &["pytorch"]),
    ("TensorFlow", &["tensorflow"]),
    ("Pandas", &["pandas"]),
    ("Spark", &["spark", "apache spark"]),
    ("Figma", &["figma"]),
    ("Agile", &["agile", "scrum"]),
];

/// Known skills mentioned in `text`, in vocabulary order.
pub fn detect_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    KNOWN_SKILLS
        .iter()
        .filter(|(_, aliases)| aliases.iter().any(|alias| contains_term(&lower, alias)))
        .map(|(canonical, _)| canonical.to_string())
        .collect()
}

/// Appends skills not already present (case-insensitive). Returns the ones added.
pub fn merge_skills(existing: &mut Vec<String>, detected: &[String], max: usize) -> Vec<String> {
    let mut seen: HashSet<String> = existing.iter().map(|s| s.to_lowercase()).collect();
    let mut added = Vec::new();
    for skill in detected {
        if existing.len() >= max {
            break;
        }
        if seen.insert(skill.to_lowercase()) {
            existing.push(skill.clone());
            added.push(skill.clone());
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_aliases_once() {
        let text = "Built services in Rust and Golang on Postgres; deployed to k8s and Kubernetes.";
        assert_eq!(
            detect_skills(text),
            vec!["Rust", "Go", "PostgreSQL", "Kubernetes"]
        );
    }

    #[test]
    fn test_word_boundaries() {
        // "javascript" must not yield Java; "trust" must not yield Rust.
        let skills = detect_skills("JavaScript developer you can trust");
        assert_eq!(skills, vec!["JavaScript"]);
    }

    #[test]
    fn test_symbol_skills() {
        let skills = detect_skills("Experience: C++, C#, .NET and Node.js");
        assert!(skills.contains(&"C++".to_string()));
        assert!(skills.contains(&"C#".to_string()));
        assert!(skills.contains(&".NET".to_string()));
        assert!(skills.contains(&"Node.js".to_string()));
    }

    #[test]
    fn test_merge_skips_existing_case_insensitive() {
        let mut existing = vec!["rust".to_string()];
        let added = merge_skills(
            &mut existing,
            &["Rust".to_string(), "Docker".to_string()],
            100,
        );
        assert_eq!(added, vec!["Docker"]);
        assert_eq!(existing, vec!["rust", "Docker"]);
    }

    #[test]
    fn test_merge_respects_cap() {
        let mut existing = vec!["a".to_string(), "b".to_string()];
        let added = merge_skills(&mut existing, &["c".to_string(), "d".to_string()], 3);
        assert_eq!(added, vec!["c"]);
        assert_eq!(existing.len(), 3);
    }
}
