use crate::facebook::Post;
use crate::lark::{FieldNames, KeyIndex, RecordUpdate};

/// Posts split by whether their key already exists in the table.
#[derive(Debug, Default, PartialEq)]
pub struct UpsertPlan {
    pub creates: Vec<Post>,
    pub updates: Vec<RecordUpdate>,
}

/// Partition `posts` against `index`. Every post lands in exactly one side,
/// decided only by key presence. Updates carry recomputed fields.
pub fn plan(index: &KeyIndex, posts: &[Post], fields: &FieldNames) -> UpsertPlan {
    let mut plan = UpsertPlan::default();
    for post in posts {
        match index.get(&post.id) {
            Some(record_id) => plan.updates.push(RecordUpdate {
                record_id: record_id.clone(),
                fields: fields.record_fields(post),
            }),
            None => plan.creates.push(post.clone()),
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            created_time: "2024-01-01T00:00:00+0000".to_string(),
        }
    }

    fn index(pairs: &[(&str, &str)]) -> KeyIndex {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_partition_by_key_presence() {
        let idx = index(&[("A", "recA")]);
        let posts = vec![post("A"), post("B"), post("C")];
        let p = plan(&idx, &posts, &FieldNames::default());

        let created: Vec<&str> = p.creates.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(created, ["B", "C"]);
        assert_eq!(p.updates.len(), 1);
        assert_eq!(p.updates[0].record_id, "recA");
        assert_eq!(p.updates[0].fields["Post ID"], "A");
        assert_eq!(p.updates[0].fields["Thời gian đăng"], 1_704_067_200_000i64);
    }

    #[test]
    fn test_empty_inputs() {
        let p = plan(&KeyIndex::new(), &[], &FieldNames::default());
        assert_eq!(p, UpsertPlan::default());
    }

    #[test]
    fn test_partition_is_total_and_disjoint() {
        let fields = FieldNames::default();
        for n_posts in 0..12usize {
            for stride in 1..5usize {
                let posts: Vec<Post> = (0..n_posts).map(|i| post(&format!("p{i}"))).collect();
                let idx: KeyIndex = (0..n_posts + 3)
                    .step_by(stride)
                    .map(|i| (format!("p{i}"), format!("rec{i}")))
                    .collect();

                let p = plan(&idx, &posts, &fields);
                assert_eq!(p.creates.len() + p.updates.len(), posts.len());

                let created: HashSet<String> = p.creates.iter().map(|p| p.id.clone()).collect();
                let updated: HashSet<String> = p
                    .updates
                    .iter()
                    .map(|u| u.fields["Post ID"].as_str().unwrap().to_string())
                    .collect();
                assert!(created.is_disjoint(&updated));
                assert!(created.iter().all(|id| !idx.contains_key(id)));
                assert!(updated.iter().all(|id| idx.contains_key(id)));
                for u in &p.updates {
                    let key = u.fields["Post ID"].as_str().unwrap();
                    assert_eq!(idx[key], u.record_id);
                }
            }
        }
    }
}
