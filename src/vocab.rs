//! Fixed tag vocabularies.
//!
//! A post has no explicit course/semester/subject fields. Those categories are
//! inferred from its flat tag list by checking tags against the vocabularies
//! defined here.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;

/// Sentinel selection meaning "no course constraint".
pub const ALL_COURSES: &str = "All Courses";
/// Sentinel selection meaning "no semester constraint".
pub const ALL_SEMESTERS: &str = "All Semesters";
/// Sentinel selection meaning "no subject constraint".
pub const ALL_SUBJECTS: &str = "All Subjects";

/// Bucket for posts without a semester tag.
pub const MISCELLANEOUS: &str = "Miscellaneous";

/// Course codes, in display order.
pub const COURSES: [&str; 5] = ["CSE", "IT", "BIOTECH", "ECE", "BBA"];

/// Semester labels, in display order.
pub const SEMESTERS: [&str; 8] = [
    "Semester 1",
    "Semester 2",
    "Semester 3",
    "Semester 4",
    "Semester 5",
    "Semester 6",
    "Semester 7",
    "Semester 8",
];

/// General category tags. These are never treated as a subject.
pub const GENERAL_TAGS: [&str; 10] = [
    "Academic",
    "Events",
    "Campus Life",
    "Questions",
    "Discussion",
    "Announcement",
    "Help Wanted",
    "Resources",
    "Student Activities",
    "Faculty",
];

/// Built-in curriculum: (course, semester, subjects).
const CURRICULUM: &[(&str, &str, [&str; 2])] = &[
    ("CSE", "Semester 1", ["C Programming", "Physics-1"]),
    ("CSE", "Semester 2", ["Physics-2", "OOPS"]),
    ("CSE", "Semester 3", ["Electrical Science", "DBMS"]),
    ("CSE", "Semester 4", ["Digital Systems", "EVS"]),
    ("CSE", "Semester 5", ["Operating System", "COA"]),
    ("CSE", "Semester 6", ["Blockchain", "Computer Networks"]),
    ("CSE", "Semester 7", ["Graph Theory", "Political Philosophy"]),
    ("CSE", "Semester 8", ["Astrophysics", "Agile Methodology"]),
    ("IT", "Semester 1", ["C Programming", "Physics-1"]),
    ("IT", "Semester 2", ["Physics-2", "OOPS"]),
    ("IT", "Semester 3", ["Electrical Science", "DBMS"]),
    ("IT", "Semester 4", ["Digital Systems", "EVS"]),
    ("IT", "Semester 5", ["Operating System", "COA"]),
    ("IT", "Semester 6", ["Blockchain", "Computer Networks"]),
    ("IT", "Semester 7", ["Graph Theory", "Political Philosophy"]),
    ("IT", "Semester 8", ["Astrophysics", "Agile Methodology"]),
    ("BIOTECH", "Semester 1", ["Biology Fundamentals", "Chemistry-1"]),
    ("BIOTECH", "Semester 2", ["Chemistry-2", "Cell Biology"]),
    ("BIOTECH", "Semester 3", ["Biochemistry", "Microbiology"]),
    ("BIOTECH", "Semester 4", ["Genetics", "Molecular Biology"]),
    ("BIOTECH", "Semester 5", ["Immunology", "Bioprocess Engineering"]),
    ("BIOTECH", "Semester 6", ["Bioinformatics", "Genomics"]),
    ("BIOTECH", "Semester 7", ["Tissue Engineering", "Bioethics"]),
    ("BIOTECH", "Semester 8", ["Pharmaceutical Biotechnology", "Biosafety"]),
    ("ECE", "Semester 1", ["Basic Electronics", "Physics-1"]),
    ("ECE", "Semester 2", ["Physics-2", "Circuit Theory"]),
    ("ECE", "Semester 3", ["Analog Electronics", "Digital Electronics"]),
    ("ECE", "Semester 4", ["Microprocessors", "Signals and Systems"]),
    ("ECE", "Semester 5", ["Communication Systems", "Control Systems"]),
    ("ECE", "Semester 6", ["VLSI Design", "Embedded Systems"]),
    ("ECE", "Semester 7", ["Wireless Communication", "Antenna Theory"]),
    ("ECE", "Semester 8", ["IoT Systems", "Robotics"]),
    ("BBA", "Semester 1", ["Principles of Management", "Business Economics"]),
    ("BBA", "Semester 2", ["Financial Accounting", "Business Communication"]),
    ("BBA", "Semester 3", ["Marketing Management", "Organizational Behavior"]),
    ("BBA", "Semester 4", ["Business Law", "Human Resource Management"]),
    ("BBA", "Semester 5", ["Operations Management", "Financial Management"]),
    ("BBA", "Semester 6", ["Strategic Management", "International Business"]),
    ("BBA", "Semester 7", ["Entrepreneurship", "Business Ethics"]),
    ("BBA", "Semester 8", ["Project Management", "Digital Marketing"]),
];

/// Every distinct subject of the built-in curriculum, sorted.
static ALL_CURRICULUM_SUBJECTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    CURRICULUM
        .iter()
        .flat_map(|(_, _, subjects)| subjects.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
});

#[must_use]
pub fn is_course(tag: &str) -> bool {
    COURSES.contains(&tag)
}

#[must_use]
pub fn is_semester(tag: &str) -> bool {
    SEMESTERS.contains(&tag)
}

/// Semester labels plus the "Miscellaneous" bucket.
#[must_use]
pub fn is_semester_bucket(tag: &str) -> bool {
    is_semester(tag) || tag == MISCELLANEOUS
}

#[must_use]
pub fn is_general(tag: &str) -> bool {
    GENERAL_TAGS.contains(&tag)
}

/// True when a tag belongs to none of the structural vocabularies.
#[must_use]
pub fn is_subject_candidate(tag: &str) -> bool {
    !is_course(tag) && !is_semester_bucket(tag) && !is_general(tag)
}

/// Built-in subjects for a course and semester.
///
/// Returns an empty list when either selection is a sentinel or unknown.
#[must_use]
pub fn curriculum_subjects(course: &str, semester: &str) -> Vec<&'static str> {
    CURRICULUM
        .iter()
        .find(|(c, s, _)| *c == course && *s == semester)
        .map(|(_, _, subjects)| subjects.to_vec())
        .unwrap_or_default()
}

/// Every subject of the built-in curriculum, deduplicated and sorted.
#[must_use]
pub fn all_curriculum_subjects() -> &'static [&'static str] {
    &ALL_CURRICULUM_SUBJECTS
}

/// Tag names seeded into an empty tag table.
#[must_use]
pub fn default_tag_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    names.extend(GENERAL_TAGS);
    names.extend(SEMESTERS);
    names.push(MISCELLANEOUS);
    names.extend(COURSES);
    for subject in all_curriculum_subjects() {
        if !names.contains(subject) {
            names.push(subject);
        }
    }
    names
}
