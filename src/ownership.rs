use crate::error::AppError;
use crate::models::{Owned, UserId};

/// Records from `records` whose owner is `user`. An empty result is not an error.
pub fn owned_by<'a, T, I>(records: I, user: UserId) -> Vec<&'a T>
where
    T: Owned + 'a,
    I: IntoIterator<Item = &'a T>,
{
    records
        .into_iter()
        .filter(|record| record.owner() == Some(user))
        .collect()
}

/// Access check run before a record is shown or changed.
///
/// Records owned by someone else are reported as missing so the caller cannot
/// tell them apart from ids that were never assigned.
pub fn authorize<T: Owned>(user: UserId, record: Option<&T>) -> Result<&T, AppError> {
    match record {
        Some(record) if record.owner() == Some(user) => Ok(record),
        _ => Err(AppError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;

    fn client(id: u64, owner: Option<UserId>) -> Client {
        Client {
            id,
            name: format!("Client {id}"),
            owner,
        }
    }

    #[test]
    fn owned_by_keeps_only_matching_owner() {
        let clients = vec![client(1, Some(1)), client(2, Some(2)), client(3, Some(1))];
        let ids: Vec<u64> = owned_by(&clients, 1).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn ownerless_records_are_never_listed() {
        let clients = vec![client(1, None)];
        assert!(owned_by(&clients, 1).is_empty());
    }

    #[test]
    fn authorize_hides_foreign_records() {
        let foreign = client(1, Some(2));
        assert!(matches!(
            authorize(1, Some(&foreign)),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            authorize::<Client>(1, None),
            Err(AppError::NotFound)
        ));
        assert_eq!(authorize(2, Some(&foreign)).unwrap().id, 1);
    }
}
