// ==========================================
// 实验室排课管理 - 引用解析器
// ==========================================
// 职责: 房间编码 / 教师邮箱 → 内部 ID
// 规则: 精确匹配（区分大小写,去首尾空白）
// 红线: 尽力而为,未命中保留原文,绝不中断批次
// ==========================================

use crate::domain::timetable::{EntityRef, ReferenceCatalogs, TimetableRow};

pub struct ReferenceResolver;

impl ReferenceResolver {
    /// 解析单行的房间与教师引用
    ///
    /// - 目录为空: 保持 Pending（无从对照）
    /// - 目录非空且命中: Resolved
    /// - 目录非空未命中: Unresolved（保留原文）
    /// - 已解析: 不变
    pub fn resolve(&self, mut row: TimetableRow, catalogs: &ReferenceCatalogs) -> TimetableRow {
        row.room = row.room.map(|room| self.resolve_room(room, catalogs));
        row.lecturer = row
            .lecturer
            .map(|lecturer| self.resolve_lecturer(lecturer, catalogs));
        row
    }

    fn resolve_room(&self, room: EntityRef, catalogs: &ReferenceCatalogs) -> EntityRef {
        let raw = match room {
            EntityRef::Resolved { .. } => return room,
            EntityRef::Pending { raw } | EntityRef::Unresolved { raw } => raw,
        };
        if catalogs.rooms.is_empty() {
            return EntityRef::Pending { raw };
        }

        let key = raw.trim();
        match catalogs.rooms.iter().find(|r| r.room_id.trim() == key) {
            Some(item) => EntityRef::Resolved {
                id: item.id.clone(),
                natural_key: key.to_string(),
            },
            None => EntityRef::Unresolved { raw },
        }
    }

    fn resolve_lecturer(&self, lecturer: EntityRef, catalogs: &ReferenceCatalogs) -> EntityRef {
        let raw = match lecturer {
            EntityRef::Resolved { .. } => return lecturer,
            EntityRef::Pending { raw } | EntityRef::Unresolved { raw } => raw,
        };
        if catalogs.lecturers.is_empty() {
            return EntityRef::Pending { raw };
        }

        let key = raw.trim();
        let embedded = embedded_email(key);
        let hit = catalogs
            .lecturers
            .iter()
            .find(|l| l.email.trim() == key)
            .or_else(|| {
                embedded.and_then(|email| catalogs.lecturers.iter().find(|l| l.email.trim() == email))
            });

        match hit {
            Some(item) => EntityRef::Resolved {
                id: item.id.clone(),
                natural_key: key.to_string(),
            },
            None => EntityRef::Unresolved { raw },
        }
    }
}

/// 提取 "姓名 (email)" 形式中的括号内容
fn embedded_email(value: &str) -> Option<&str> {
    let open = value.rfind('(')?;
    let inner = value[open + 1..].strip_suffix(')')?.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::{LecturerCatalogItem, RoomCatalogItem};

    fn catalogs() -> ReferenceCatalogs {
        ReferenceCatalogs::new(
            vec![RoomCatalogItem {
                room_id: "P101".to_string(),
                id: "r1".to_string(),
                name: "Phòng máy 1".to_string(),
            }],
            vec![LecturerCatalogItem {
                email: "a@x.edu".to_string(),
                id: "u1".to_string(),
                name: "Nguyễn Văn A".to_string(),
            }],
        )
    }

    fn row_with(room: &str, lecturer: &str) -> TimetableRow {
        let mut row = TimetableRow::blank(0);
        row.room = Some(EntityRef::pending(room));
        row.lecturer = Some(EntityRef::pending(lecturer));
        row
    }

    #[test]
    fn test_resolve_hits() {
        let row = ReferenceResolver.resolve(row_with(" P101 ", "a@x.edu"), &catalogs());

        assert_eq!(row.room.as_ref().and_then(|r| r.resolved_id()), Some("r1"));
        assert_eq!(row.lecturer.as_ref().and_then(|l| l.resolved_id()), Some("u1"));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let row = ReferenceResolver.resolve(row_with("p101", "A@x.edu"), &catalogs());

        assert_eq!(row.room, Some(EntityRef::Unresolved { raw: "p101".to_string() }));
        assert_eq!(
            row.lecturer,
            Some(EntityRef::Unresolved {
                raw: "A@x.edu".to_string()
            })
        );
    }

    #[test]
    fn test_resolve_name_with_email() {
        let row = ReferenceResolver.resolve(row_with("P101", "Nguyễn Văn A (a@x.edu)"), &catalogs());
        assert_eq!(row.lecturer.as_ref().and_then(|l| l.resolved_id()), Some("u1"));
        assert_eq!(
            row.lecturer.as_ref().map(|l| l.natural_key()),
            Some("Nguyễn Văn A (a@x.edu)")
        );
    }

    #[test]
    fn test_empty_catalog_keeps_pending() {
        let row = ReferenceResolver.resolve(row_with("P999", "b@x.edu"), &ReferenceCatalogs::default());

        assert_eq!(row.room, Some(EntityRef::pending("P999")));
        assert_eq!(row.lecturer, Some(EntityRef::pending("b@x.edu")));
    }

    #[test]
    fn test_unresolved_keeps_raw_text() {
        let row = ReferenceResolver.resolve(row_with("P999", "a@x.edu"), &catalogs());
        assert_eq!(row.room.as_ref().map(|r| r.natural_key()), Some("P999"));
        assert!(row.room.as_ref().unwrap().is_unresolved());
    }
}
